use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Game is the primary resource managed by this controller.
/// One Game maps to one Deployment serving a js-dos page for the downloaded bundle.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[kube(
    group = "operator.contrib.dosbox.com",
    version = "v1alpha1",
    kind = "Game",
    plural = "games",
    singular = "game",
    namespaced,
    status = "GameStatus",
    printcolumn = r#"{"name":"Game", "type":"string", "jsonPath":".spec.gameName"}"#,
    printcolumn = r#"{"name":"Url", "type":"string", "jsonPath":".spec.url"}"#,
    printcolumn = r#"{"name":"Ready", "type":"boolean", "jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GameSpec {
    /// Human readable name of the game
    pub game_name: String,

    /// Download location of the game bundle
    #[schemars(regex(
        pattern = r"^https?:\/\/(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_\+.~#?&\/=]*)$"
    ))]
    pub url: String,

    /// Whether the game should be running
    #[serde(default)]
    pub deploy: bool,

    /// Port the game is served on
    #[serde(default = "default_port")]
    #[schemars(range(min = 1, max = 65535))]
    pub port: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    /// Unset until the first readiness evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready: Option<bool>,
}

/// Three-valued view of `status.ready`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Readiness {
    /// Never evaluated, `ready` is unset
    #[default]
    Unknown,
    NotReady,
    Ready,
}

impl Readiness {
    pub fn from_wire(ready: Option<bool>) -> Self {
        match ready {
            None => Readiness::Unknown,
            Some(false) => Readiness::NotReady,
            Some(true) => Readiness::Ready,
        }
    }

    pub fn to_wire(self) -> Option<bool> {
        match self {
            Readiness::Unknown => None,
            Readiness::NotReady => Some(false),
            Readiness::Ready => Some(true),
        }
    }

    pub fn is_ready(self) -> bool {
        self == Readiness::Ready
    }
}

impl From<bool> for Readiness {
    fn from(ready: bool) -> Self {
        if ready {
            Readiness::Ready
        } else {
            Readiness::NotReady
        }
    }
}

impl Game {
    pub fn readiness(&self) -> Readiness {
        Readiness::from_wire(self.status.as_ref().and_then(|s| s.ready))
    }
}

fn default_port() -> i32 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn test_spec_defaults() {
        let spec: GameSpec = serde_json::from_value(serde_json::json!({
            "gameName": "Doom",
            "url": "https://example.com/doom.zip"
        }))
        .unwrap();

        assert!(!spec.deploy);
        assert_eq!(spec.port, 8080);
    }

    #[test]
    fn test_readiness_wire_mapping() {
        assert_eq!(Readiness::from_wire(None), Readiness::Unknown);
        assert_eq!(Readiness::from_wire(Some(false)), Readiness::NotReady);
        assert_eq!(Readiness::from_wire(Some(true)), Readiness::Ready);
        assert_eq!(Readiness::NotReady.to_wire(), Some(false));
        assert_eq!(Readiness::Unknown.to_wire(), None);
    }

    #[test]
    fn test_unset_status_is_omitted() {
        let status = GameStatus::default();
        assert_eq!(serde_json::to_value(&status).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_crd_shape() {
        let crd = Game::crd();
        assert_eq!(crd.spec.group, "operator.contrib.dosbox.com");
        assert_eq!(crd.spec.names.kind, "Game");
        assert_eq!(crd.spec.scope, "Namespaced");

        let version = &crd.spec.versions[0];
        assert_eq!(version.name, "v1alpha1");
        let columns: Vec<_> = version
            .additional_printer_columns
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(columns, vec!["Game", "Url", "Ready", "Age"]);
    }
}
