use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::tool::Tool;

/// Entry action of every SSM tool state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    #[default]
    #[serde(rename = "init")]
    Init,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// JSON object that keeps its keys in document order, so a job serializes back
/// to the text it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.0.iter().map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.0.iter().map(|(_, value)| value)
    }

    /// Inserts at the end, or replaces in place when the key is already present.
    pub fn insert(&mut self, key: String, value: V) {
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::default();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NamesValuesArgs {
    pub names_values: OrderedMap<String>,
    /// `None` when the job has no `tags` key; an explicit `[]` is kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RemoveArgs {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RenameArgs {
    /// Old parameter name to new parameter name.
    pub names: OrderedMap<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FixTagsArgs {
    /// Tag key to the values that mark a parameter as needing new tags.
    pub to_update: OrderedMap<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterAction {
    Create(NamesValuesArgs),
    Update(NamesValuesArgs),
    Remove(RemoveArgs),
    Rename(RenameArgs),
    FixTags(FixTagsArgs),
}

impl ParameterAction {
    /// Wire name understood by the parameter tool. `delete` jobs normalize to `remove`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Remove(_) => "remove",
            Self::Rename(_) => "rename",
            Self::FixTags(_) => "fix_tags",
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawParameterJob")]
pub struct ParameterJob {
    pub action: ParameterAction,
    pub accounts_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParameterJob {
    #[allow(dead_code)]
    action: JobPhase,
    job_action: String,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    accounts_key: Option<String>,
}

impl TryFrom<RawParameterJob> for ParameterJob {
    type Error = ValidationError;

    fn try_from(raw: RawParameterJob) -> Result<Self, Self::Error> {
        let job_action = raw.job_action.trim().to_ascii_lowercase();
        let action = match job_action.as_str() {
            "create" => ParameterAction::Create(parse_args(&job_action, raw.args)?),
            "update" => ParameterAction::Update(parse_args(&job_action, raw.args)?),
            "delete" | "remove" => ParameterAction::Remove(parse_args(&job_action, raw.args)?),
            "rename" => ParameterAction::Rename(parse_args(&job_action, raw.args)?),
            "fix_tags" => ParameterAction::FixTags(parse_args(&job_action, raw.args)?),
            _ => {
                return Err(ValidationError::new(format!(
                    "Unsupported job_action '{}' (expected create, update, delete, remove, rename, or fix_tags)",
                    raw.job_action
                )))
            }
        };

        let job = ParameterJob {
            action,
            accounts_key: normalize_optional_key(raw.accounts_key),
        };
        job.validate()?;
        Ok(job)
    }
}

impl Serialize for ParameterJob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let field_count = if self.accounts_key.is_some() { 4 } else { 3 };
        let mut state = serializer.serialize_struct("ParameterJob", field_count)?;
        state.serialize_field("action", &JobPhase::Init)?;
        state.serialize_field("job_action", self.action.name())?;
        match &self.action {
            ParameterAction::Create(args) | ParameterAction::Update(args) => {
                state.serialize_field("args", args)?
            }
            ParameterAction::Remove(args) => state.serialize_field("args", args)?,
            ParameterAction::Rename(args) => state.serialize_field("args", args)?,
            ParameterAction::FixTags(args) => state.serialize_field("args", args)?,
        }
        if let Some(accounts_key) = &self.accounts_key {
            state.serialize_field("accounts_key", accounts_key)?;
        }
        state.end()
    }
}

impl ParameterJob {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.action {
            ParameterAction::Create(args) | ParameterAction::Update(args) => {
                if args.names_values.is_empty() {
                    return Err(ValidationError::new(format!(
                        "{} job requires at least one entry in names_values",
                        self.action.name()
                    )));
                }
                ensure_names(args.names_values.keys(), "names_values")?;
                validate_tags(args.tags.as_deref().unwrap_or_default())
            }
            ParameterAction::Remove(args) => {
                if args.names.is_empty() {
                    return Err(ValidationError::new(
                        "remove job requires at least one parameter name",
                    ));
                }
                ensure_names(args.names.iter(), "names")
            }
            ParameterAction::Rename(args) => {
                if args.names.is_empty() {
                    return Err(ValidationError::new(
                        "rename job requires at least one old_name/new_name pair",
                    ));
                }
                ensure_names(args.names.keys(), "names")?;
                ensure_names(args.names.values(), "names")?;
                if let Some((name, _)) = args.names.iter().find(|(old, new)| old == new) {
                    return Err(ValidationError::new(format!(
                        "rename job maps parameter '{name}' to itself"
                    )));
                }
                Ok(())
            }
            ParameterAction::FixTags(args) => {
                if args.to_update.is_empty() {
                    return Err(ValidationError::new(
                        "fix_tags job requires at least one tag key in to_update",
                    ));
                }
                ensure_names(args.to_update.keys(), "to_update")?;
                if let Some((key, _)) = args.to_update.iter().find(|(_, values)| values.is_empty())
                {
                    return Err(ValidationError::new(format!(
                        "to_update tag '{key}' must list at least one value"
                    )));
                }
                validate_tags(args.tags.as_deref().unwrap_or_default())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeployDocumentJob {
    pub action: JobPhase,
    /// Outer `None` when the key is absent: the tool then targets the host account
    /// in every region. A present key, even `null` or blank, selects accounts from
    /// an account list, falling back to the shared one.
    #[serde(
        default,
        deserialize_with = "deserialize_present_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub accounts_key: Option<Option<String>>,
}

fn deserialize_present_key<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<String>>, D::Error> {
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandTarget {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Values")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunDocumentArgs {
    pub document: String,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub parameters: OrderedMap<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<CommandTarget>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunDocumentJob {
    pub action: JobPhase,
    #[serde(alias = "arguments")]
    pub args: RunDocumentArgs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_list: Option<String>,
}

impl RunDocumentJob {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.args.document.trim().is_empty() {
            return Err(ValidationError::new(
                "run_document job requires a non-empty document name",
            ));
        }
        if let Some(instance_ids) = &self.args.instance_ids {
            ensure_names(instance_ids.iter(), "instance_ids")?;
        }
        if let Some(targets) = &self.args.targets {
            if let Some(target) = targets.iter().find(|target| target.values.is_empty()) {
                return Err(ValidationError::new(format!(
                    "target '{}' must list at least one value",
                    target.key
                )));
            }
        }
        Ok(())
    }
}

/// One unit of work submitted as a single state machine execution.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum JobDocument {
    Parameter(ParameterJob),
    DeployDocument(DeployDocumentJob),
    RunDocument(RunDocumentJob),
}

impl JobDocument {
    /// Parses and validates a job for `tool`. Nothing invalid leaves this function.
    pub fn from_value(tool: Tool, value: Value) -> Result<Self, ValidationError> {
        if !value.is_object() {
            return Err(ValidationError::new("Job document must be a JSON object"));
        }

        let malformed = |error: serde_json::Error| {
            ValidationError::new(format!("Malformed {tool} job: {error}"))
        };

        match tool {
            Tool::Parameter => serde_json::from_value::<ParameterJob>(value)
                .map(Self::Parameter)
                .map_err(malformed),
            Tool::DeployDocument => serde_json::from_value::<DeployDocumentJob>(value)
                .map(Self::DeployDocument)
                .map_err(malformed),
            Tool::RunDocument => {
                let job = serde_json::from_value::<RunDocumentJob>(value).map_err(malformed)?;
                job.validate()?;
                Ok(Self::RunDocument(job))
            }
        }
    }

    pub fn from_json(tool: Tool, text: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|error| ValidationError::new(format!("Malformed JSON: {error}")))?;
        Self::from_value(tool, value)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Parameter(job) => job.validate(),
            Self::DeployDocument(_) => Ok(()),
            Self::RunDocument(job) => job.validate(),
        }
    }

    pub fn tool(&self) -> Tool {
        match self {
            Self::Parameter(_) => Tool::Parameter,
            Self::DeployDocument(_) => Tool::DeployDocument,
            Self::RunDocument(_) => Tool::RunDocument,
        }
    }

    /// Short description used in log lines, e.g. `create` or `run_document:AWS-RunShellScript`.
    pub fn summary(&self) -> String {
        match self {
            Self::Parameter(job) => job.action.name().to_string(),
            Self::DeployDocument(_) => "deploy_document".to_string(),
            Self::RunDocument(job) => format!("run_document:{}", job.args.document),
        }
    }

    /// Serialized execution input handed to the state machine.
    pub fn execution_input(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

fn parse_args<T: serde::de::DeserializeOwned>(
    job_action: &str,
    args: Value,
) -> Result<T, ValidationError> {
    if args.is_null() {
        return Err(ValidationError::new(format!(
            "{job_action} job requires an args object"
        )));
    }
    serde_json::from_value(args).map_err(|error| {
        ValidationError::new(format!("Malformed args for job_action '{job_action}': {error}"))
    })
}

fn ensure_names<'a>(
    names: impl Iterator<Item = &'a String>,
    field: &str,
) -> Result<(), ValidationError> {
    for name in names {
        if name.trim().is_empty() {
            return Err(ValidationError::new(format!(
                "{field} entries must be non-empty strings"
            )));
        }
    }
    Ok(())
}

fn validate_tags(tags: &[Tag]) -> Result<(), ValidationError> {
    if tags.iter().any(|tag| tag.key.trim().is_empty()) {
        return Err(ValidationError::new("tag keys must be non-empty strings"));
    }
    Ok(())
}

fn normalize_optional_key(key: Option<String>) -> Option<String> {
    key.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
