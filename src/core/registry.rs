use crate::domain::model::{CategoryNode, LeafCategory, ModelBinding};
use crate::utils::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// 未設定顏色時使用的預設值
pub const DEFAULT_CATEGORY_COLOR: &str = "#C1272D";

/// 設定檔中的頂層類別
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub name: String,
    pub model: Option<String>,
    pub data_column: Option<String>,
    pub color: Option<String>,
    pub subcategories: Option<Vec<SubcategoryDefinition>>,
}

/// 子類別不可再有下一層
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubcategoryDefinition {
    pub name: String,
    pub model: Option<String>,
    pub data_column: Option<String>,
    pub color: Option<String>,
}

/// 靜態類別樹與扁平化的模型綁定表
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    nodes: Vec<CategoryNode>,
    flattened: BTreeMap<String, ModelBinding>,
}

impl CategoryRegistry {
    pub fn new(nodes: Vec<CategoryNode>) -> Result<Self> {
        validate_tree(&nodes)?;
        let flattened = flatten_tree(&nodes);

        tracing::debug!(
            "Category registry built: {} top-level categories, {} forecast targets",
            nodes.len(),
            flattened.len()
        );

        Ok(Self { nodes, flattened })
    }

    pub fn from_definitions(definitions: &[CategoryDefinition]) -> Result<Self> {
        let nodes = definitions
            .iter()
            .map(|def| match &def.subcategories {
                Some(children) if !children.is_empty() || def.model.is_none() => {
                    if def.model.is_some() || def.data_column.is_some() {
                        return Err(ForecastError::RegistryError {
                            message: format!(
                                "branch category '{}' cannot own a model or data column",
                                def.name
                            ),
                        });
                    }
                    Ok(CategoryNode::Branch {
                        name: def.name.clone(),
                        color: def.color.clone(),
                        subcategories: children
                            .iter()
                            .map(|sub| LeafCategory {
                                name: sub.name.clone(),
                                model_ref: sub.model.clone(),
                                data_column: sub.data_column.clone(),
                                color: sub.color.clone(),
                            })
                            .collect(),
                    })
                }
                _ => Ok(CategoryNode::Leaf(LeafCategory {
                    name: def.name.clone(),
                    model_ref: def.model.clone(),
                    data_column: def.data_column.clone(),
                    color: def.color.clone(),
                })),
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(nodes)
    }

    /// 內建的類別樹：整體、居住地、性別、年齡層、教育程度
    pub fn builtin() -> Self {
        fn leaf(name: &str, model: &str, column: Option<&str>, color: &str) -> LeafCategory {
            LeafCategory {
                name: name.to_string(),
                model_ref: Some(model.to_string()),
                data_column: column.map(str::to_string),
                color: Some(color.to_string()),
            }
        }
        fn branch(name: &str, subcategories: Vec<LeafCategory>) -> CategoryNode {
            CategoryNode::Branch {
                name: name.to_string(),
                color: None,
                subcategories,
            }
        }

        let nodes = vec![
            CategoryNode::Leaf(leaf(
                "Ensemble",
                "sarima_model.json",
                Some("Ensemble"),
                "#006233",
            )),
            branch(
                "Milieu",
                vec![
                    leaf("Urbain", "sarima_urbain.json", Some("Urbain"), "#0066CC"),
                    leaf("Rural", "sarima_rural.json", Some("Rural"), "#FF6600"),
                ],
            ),
            branch(
                "Genre",
                vec![
                    leaf("Féminin", "sarima_feminin.json", None, "#FF69B4"),
                    leaf("Masculin", "sarima_masculin.json", None, "#4169E1"),
                ],
            ),
            branch(
                "Tranche d'âge",
                vec![
                    leaf("Age 15-24", "sarima_age_15_24.json", None, "#FF4500"),
                    leaf("Age 25-34", "sarima_age_25_34.json", None, "#FF8C00"),
                    leaf("Age 35-44", "sarima_age_35_44.json", None, "#FFA500"),
                    leaf("Age 45+", "sarima_age_45_plus.json", None, "#FF6347"),
                ],
            ),
            branch(
                "Niveau d'éducation",
                vec![
                    leaf("Sans diplôme", "sarima_sans_diplome.json", None, "#8B0000"),
                    leaf("Niveau moyen", "sarima_niveau_moyen.json", None, "#228B22"),
                    leaf(
                        "Niveau supérieur",
                        "sarima_niveau_superieur.json",
                        None,
                        "#32CD32",
                    ),
                ],
            ),
        ];

        let flattened = flatten_tree(&nodes);
        Self { nodes, flattened }
    }

    pub fn hierarchy(&self) -> &[CategoryNode] {
        &self.nodes
    }

    /// 扁平化的預測目標：葉節點名稱 -> {模型, 顏色}
    pub fn flatten(&self) -> &BTreeMap<String, ModelBinding> {
        &self.flattened
    }

    pub fn binding(&self, name: &str) -> Result<&ModelBinding> {
        self.flattened
            .get(name)
            .ok_or_else(|| ForecastError::UnknownCategory {
                name: name.to_string(),
            })
    }

    pub fn resolve(&self, name: &str) -> Result<&CategoryNode> {
        self.nodes
            .iter()
            .find(|node| node.name() == name)
            .ok_or_else(|| ForecastError::UnknownCategory {
                name: name.to_string(),
            })
    }

    pub fn resolve_leaf(&self, name: &str) -> Result<&LeafCategory> {
        self.leaves()
            .find(|leaf| leaf.name == name)
            .ok_or_else(|| ForecastError::UnknownCategory {
                name: name.to_string(),
            })
    }

    /// 依設定順序列出所有葉節點
    pub fn leaves(&self) -> impl Iterator<Item = &LeafCategory> {
        self.nodes.iter().flat_map(|node| match node {
            CategoryNode::Leaf(leaf) => std::slice::from_ref(leaf).iter(),
            CategoryNode::Branch { subcategories, .. } => subcategories.iter(),
        })
    }

    pub fn subcategories_of(&self, main_category: &str) -> Result<BTreeMap<String, ModelBinding>> {
        let node = self.resolve(main_category)?;
        Ok(node
            .subcategories()
            .iter()
            .filter_map(|sub| {
                sub.model_ref.as_ref().map(|model_ref| {
                    (
                        sub.name.clone(),
                        ModelBinding {
                            model_ref: model_ref.clone(),
                            color: sub.color_or(DEFAULT_CATEGORY_COLOR).to_string(),
                        },
                    )
                })
            })
            .collect())
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn flatten_tree(nodes: &[CategoryNode]) -> BTreeMap<String, ModelBinding> {
    let mut flattened = BTreeMap::new();
    let mut record = |leaf: &LeafCategory| {
        if let Some(model_ref) = &leaf.model_ref {
            flattened.insert(
                leaf.name.clone(),
                ModelBinding {
                    model_ref: model_ref.clone(),
                    color: leaf.color_or(DEFAULT_CATEGORY_COLOR).to_string(),
                },
            );
        }
    };

    for node in nodes {
        match node {
            CategoryNode::Leaf(leaf) => record(leaf),
            CategoryNode::Branch { subcategories, .. } => subcategories.iter().for_each(&mut record),
        }
    }

    flattened
}

fn validate_tree(nodes: &[CategoryNode]) -> Result<()> {
    let mut seen = HashSet::new();
    let mut check_name = |name: &str| -> Result<()> {
        if name.trim().is_empty() {
            return Err(ForecastError::RegistryError {
                message: "category name cannot be empty".to_string(),
            });
        }
        if !seen.insert(name.to_string()) {
            return Err(ForecastError::RegistryError {
                message: format!("duplicate category name '{}'", name),
            });
        }
        Ok(())
    };
    let check_leaf = |leaf: &LeafCategory| -> Result<()> {
        if leaf.model_ref.is_none() && leaf.data_column.is_none() {
            return Err(ForecastError::RegistryError {
                message: format!(
                    "leaf category '{}' needs a model or a data column",
                    leaf.name
                ),
            });
        }
        Ok(())
    };

    for node in nodes {
        check_name(node.name())?;
        match node {
            CategoryNode::Leaf(leaf) => check_leaf(leaf)?,
            CategoryNode::Branch {
                name, subcategories, ..
            } => {
                if subcategories.is_empty() {
                    return Err(ForecastError::RegistryError {
                        message: format!("branch category '{}' has no subcategories", name),
                    });
                }
                for sub in subcategories {
                    check_name(&sub.name)?;
                    check_leaf(sub)?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(name: &str, model: Option<&str>, column: Option<&str>) -> SubcategoryDefinition {
        SubcategoryDefinition {
            name: name.to_string(),
            model: model.map(str::to_string),
            data_column: column.map(str::to_string),
            color: None,
        }
    }

    #[test]
    fn test_builtin_registry_is_valid() {
        let registry = CategoryRegistry::builtin();
        assert!(validate_tree(registry.hierarchy()).is_ok());
        assert_eq!(registry.hierarchy().len(), 5);
        assert_eq!(registry.flatten().len(), 12);
        assert_eq!(registry.leaves().count(), 12);
    }

    #[test]
    fn test_flatten_only_contains_model_leaves() {
        let registry = CategoryRegistry::builtin();
        let flat = registry.flatten();
        assert_eq!(flat["Ensemble"].model_ref, "sarima_model.json");
        assert_eq!(flat["Urbain"].color, "#0066CC");
        assert!(!flat.contains_key("Milieu"));
        assert!(!flat.contains_key("Genre"));
    }

    #[test]
    fn test_subcategories_of_branch_and_leaf() {
        let registry = CategoryRegistry::builtin();

        let milieu = registry.subcategories_of("Milieu").unwrap();
        assert_eq!(milieu.len(), 2);
        assert_eq!(milieu["Urbain"].model_ref, "sarima_urbain.json");
        assert_eq!(milieu["Urbain"].color, "#0066CC");
        assert_eq!(milieu["Rural"].model_ref, "sarima_rural.json");
        assert_eq!(milieu["Rural"].color, "#FF6600");

        assert!(registry.subcategories_of("Ensemble").unwrap().is_empty());
        assert!(matches!(
            registry.subcategories_of("Nowhere"),
            Err(ForecastError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_resolve_and_binding() {
        let registry = CategoryRegistry::builtin();
        assert!(matches!(
            registry.resolve("Genre").unwrap(),
            CategoryNode::Branch { .. }
        ));
        assert_eq!(registry.resolve_leaf("Rural").unwrap().name, "Rural");
        assert!(registry.binding("Milieu").is_err());
        assert!(registry.binding("NoSuchCategory").is_err());
    }

    #[test]
    fn test_from_definitions_builds_tree() {
        let defs = vec![
            CategoryDefinition {
                name: "Ensemble".to_string(),
                model: Some("ensemble.json".to_string()),
                data_column: Some("Ensemble".to_string()),
                color: None,
                subcategories: None,
            },
            CategoryDefinition {
                name: "Milieu".to_string(),
                model: None,
                data_column: None,
                color: None,
                subcategories: Some(vec![
                    sub("Urbain", Some("urbain.json"), None),
                    sub("Rural", None, Some("Rural")),
                ]),
            },
        ];

        let registry = CategoryRegistry::from_definitions(&defs).unwrap();
        assert_eq!(registry.flatten().len(), 2);
        assert_eq!(registry.flatten()["Ensemble"].color, DEFAULT_CATEGORY_COLOR);
        assert_eq!(registry.subcategories_of("Milieu").unwrap().len(), 1);
        assert_eq!(registry.leaves().count(), 3);
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let defs = vec![
            CategoryDefinition {
                name: "Urbain".to_string(),
                model: Some("a.json".to_string()),
                data_column: None,
                color: None,
                subcategories: None,
            },
            CategoryDefinition {
                name: "Milieu".to_string(),
                model: None,
                data_column: None,
                color: None,
                subcategories: Some(vec![sub("Urbain", Some("b.json"), None)]),
            },
        ];
        assert!(matches!(
            CategoryRegistry::from_definitions(&defs),
            Err(ForecastError::RegistryError { .. })
        ));
    }

    #[test]
    fn test_rejects_branch_with_model_and_empty_leaf() {
        let branch_with_model = vec![CategoryDefinition {
            name: "Milieu".to_string(),
            model: Some("milieu.json".to_string()),
            data_column: None,
            color: None,
            subcategories: Some(vec![sub("Urbain", Some("u.json"), None)]),
        }];
        assert!(CategoryRegistry::from_definitions(&branch_with_model).is_err());

        let empty_leaf = vec![CategoryDefinition {
            name: "Ensemble".to_string(),
            model: None,
            data_column: None,
            color: None,
            subcategories: None,
        }];
        assert!(CategoryRegistry::from_definitions(&empty_leaf).is_err());

        let empty_branch = vec![CategoryDefinition {
            name: "Genre".to_string(),
            model: None,
            data_column: None,
            color: None,
            subcategories: Some(vec![]),
        }];
        assert!(CategoryRegistry::from_definitions(&empty_branch).is_err());
    }

    #[test]
    fn test_rejects_third_level_in_config() {
        let toml_content = r#"
name = "Urbain"
model = "u.json"

[[subcategories]]
name = "Too deep"
model = "deep.json"
"#;
        assert!(toml::from_str::<SubcategoryDefinition>(toml_content).is_err());
    }
}
