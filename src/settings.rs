//! Server-wide configuration. Each field has a default; an update replaces
//! the field only if the incoming value parses successfully — unparseable
//! or unknown keys are ignored, never rejected.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmVersion {
    Homestead,
    TangerineWhistle,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    Berlin,
    London,
    Paris,
    Shanghai,
    Cancun,
}

impl Default for EvmVersion {
    fn default() -> Self {
        EvmVersion::Cancun
    }
}

impl EvmVersion {
    pub fn parse(name: &str) -> Option<Self> {
        use EvmVersion::*;
        Some(match name {
            "homestead" => Homestead,
            "tangerineWhistle" => TangerineWhistle,
            "spuriousDragon" => SpuriousDragon,
            "byzantium" => Byzantium,
            "constantinople" => Constantinople,
            "petersburg" => Petersburg,
            "istanbul" => Istanbul,
            "berlin" => Berlin,
            "london" => London,
            "paris" => Paris,
            "shanghai" => Shanghai,
            "cancun" => Cancun,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertStringsMode {
    Default,
    Strip,
    Debug,
    VerboseDebug,
}

impl Default for RevertStringsMode {
    fn default() -> Self {
        RevertStringsMode::Default
    }
}

impl RevertStringsMode {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "default" => RevertStringsMode::Default,
            "strip" => RevertStringsMode::Strip,
            "debug" => RevertStringsMode::Debug,
            "verboseDebug" => RevertStringsMode::VerboseDebug,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    None,
    Bmc,
    Chc,
    All,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::None
    }
}

impl Engine {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "none" => Engine::None,
            "bmc" => Engine::Bmc,
            "chc" => Engine::Chc,
            "all" => Engine::All,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCheckerSettings {
    pub contracts: Vec<String>,
    pub engine: Engine,
    pub targets: Vec<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub evm_version: EvmVersion,
    pub revert_strings: RevertStringsMode,
    pub model_checker: ModelCheckerSettings,
}

/// An import-remapping rule: `[context:]prefix=target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remapping {
    pub context: Option<String>,
    pub prefix: String,
    pub target: String,
}

impl Remapping {
    pub fn parse(raw: &str) -> Option<Self> {
        let (context_and_prefix, target) = raw.split_once('=')?;
        if target.is_empty() {
            return None;
        }
        let (context, prefix) = match context_and_prefix.split_once(':') {
            Some((c, p)) => (Some(c.to_string()), p.to_string()),
            None => (None, context_and_prefix.to_string()),
        };
        if prefix.is_empty() {
            return None;
        }
        Some(Remapping {
            context,
            prefix,
            target: target.to_string(),
        })
    }
}

/// Parses `workspace/didChangeConfiguration` params or
/// `initializationOptions` against the recognized-key table.
///
/// Reads the model checker's timeout from `model-checker-timeout` (not
/// `model-checker-targets`, a distinct key covering target contracts).
/// `remapping` entries append to the existing list rather than replacing
/// it; see DESIGN.md for the reasoning.
pub fn apply_configuration(settings: &mut Settings, remappings: &mut Vec<Remapping>, value: &Value) {
    let Some(obj) = value.as_object() else {
        return;
    };

    if let Some(evm) = obj.get("evm").and_then(Value::as_str) {
        if let Some(parsed) = EvmVersion::parse(evm) {
            settings.evm_version = parsed;
        }
    }

    if let Some(mode) = obj.get("revertStrings").and_then(Value::as_str) {
        settings.revert_strings = RevertStringsMode::parse(mode).unwrap_or_default();
    }

    if let Some(entries) = obj.get("remapping").and_then(Value::as_array) {
        for entry in entries {
            if let Some(raw) = entry.as_str() {
                if let Some(remapping) = Remapping::parse(raw) {
                    remappings.push(remapping);
                }
            }
        }
    }

    if let Some(contracts) = obj
        .get("model-checker-contracts")
        .and_then(Value::as_array)
    {
        settings.model_checker.contracts = contracts
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }

    if let Some(engine) = obj.get("model-checker-engine").and_then(Value::as_str) {
        if let Some(parsed) = Engine::parse(engine) {
            settings.model_checker.engine = parsed;
        }
    }

    if let Some(targets) = obj.get("model-checker-targets").and_then(Value::as_array) {
        settings.model_checker.targets = targets
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }

    if let Some(timeout) = obj
        .get("model-checker-timeout")
        .and_then(Value::as_u64)
    {
        settings.model_checker.timeout_ms = Some(timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evm_version_replaces_on_success_ignores_on_failure() {
        let mut settings = Settings::default();
        let mut remappings = Vec::new();
        apply_configuration(&mut settings, &mut remappings, &json!({"evm": "berlin"}));
        assert_eq!(settings.evm_version, EvmVersion::Berlin);
        apply_configuration(&mut settings, &mut remappings, &json!({"evm": "not-a-version"}));
        assert_eq!(settings.evm_version, EvmVersion::Berlin);
    }

    #[test]
    fn remapping_appends_across_calls() {
        let mut settings = Settings::default();
        let mut remappings = Vec::new();
        apply_configuration(&mut settings, &mut remappings, &json!({"remapping": ["a=./a"]}));
        apply_configuration(&mut settings, &mut remappings, &json!({"remapping": ["b=./b"]}));
        assert_eq!(remappings.len(), 2);
    }

    #[test]
    fn remapping_parses_context_prefix_target() {
        let r = Remapping::parse("ctx:@lib/=node_modules/@lib/").unwrap();
        assert_eq!(r.context.as_deref(), Some("ctx"));
        assert_eq!(r.prefix, "@lib/");
        assert_eq!(r.target, "node_modules/@lib/");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut settings = Settings::default();
        let mut remappings = Vec::new();
        apply_configuration(&mut settings, &mut remappings, &json!({"bogus": true}));
        assert_eq!(settings, Settings::default());
        assert!(remappings.is_empty());
    }
}
