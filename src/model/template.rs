use serde::{Deserialize, Serialize};

use crate::{ActformError, Result, model::GraphModel};

/// A reusable replacement template.
///
/// `detector` and `replacement` hold serialized graph fragments; they are
/// parsed on demand by a [`FragmentParser`](crate::FragmentParser).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub detector: String,
    pub replacement: String,
}

impl Template {
    /// Builds a template from already constructed fragments.
    pub fn new(
        id: impl Into<String>,
        detector: &GraphModel,
        replacement: &GraphModel,
    ) -> Result<Self> {
        let id = id.into();
        Ok(Self {
            name: id.clone(),
            id,
            detector: detector.to_json()?,
            replacement: replacement.to_json()?,
        })
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<Template>(s).map_err(|e| ActformError::Template(format!("invalid template: {}", e)))
    }

    /// Parses either a single template or an array of templates.
    pub fn list_from_json(s: &str) -> Result<Vec<Self>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(Template),
            Many(Vec<Template>),
        }

        match serde_json::from_str::<OneOrMany>(s) {
            Ok(OneOrMany::One(t)) => Ok(vec![t]),
            Ok(OneOrMany::Many(ts)) => Ok(ts),
            Err(e) => Err(ActformError::Template(format!("invalid template: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeModel;

    #[test]
    fn test_template_new_serializes_fragments() {
        let detector = GraphModel::single(NodeModel::new("D", "quantme:DataPreparationTask"));
        let replacement = GraphModel::single(NodeModel::new("R", "bpmn:ServiceTask"));
        let template = Template::new("tpl", &detector, &replacement).unwrap();

        assert_eq!(GraphModel::from_json(&template.detector).unwrap(), detector);
        assert_eq!(GraphModel::from_json(&template.replacement).unwrap(), replacement);
    }

    #[test]
    fn test_list_from_json() {
        let one = r#"{ "id": "a", "detector": "{}", "replacement": "{}" }"#;
        assert_eq!(Template::list_from_json(one).unwrap().len(), 1);

        let many = format!("[{one}, {one}]");
        assert_eq!(Template::list_from_json(&many).unwrap().len(), 2);

        assert!(Template::list_from_json("42").is_err());
    }
}
