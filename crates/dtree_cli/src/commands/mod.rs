//! Command implementations.

pub mod eval;
pub mod nodes;
pub mod risk;
pub mod sensitivity;

use dtree_engine::DecisionTree;

use crate::error::Result;
use crate::model::ModelFile;

/// Load a model file and run the build/evaluate pipeline.
pub fn load_tree(model_path: &str) -> Result<DecisionTree> {
    let model = ModelFile::load(model_path)?;
    let registry = model.build_registry()?;
    let mut tree = DecisionTree::new(&registry, &model.root)?;
    tree.evaluate();
    Ok(tree)
}
