//! WGSL sources and shader compilation with diagnostics.
//!
//! [`compile`] checks the source with naga before the device sees it, then
//! creates the module and inspects the compiler messages. Warnings are
//! logged, errors are logged and returned as a [`ShaderError`].

use std::fmt;

/// Lit, textured, normal mapped instanced geometry.
pub const BASIC: &str = include_str!("pipelines/basic.wgsl");
/// Unlit coloured geometry given in clip space.
pub const FLAT: &str = include_str!("pipelines/flat.wgsl");
/// Full screen animated plasma.
pub const PLASMA: &str = include_str!("pipelines/plasma.wgsl");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One compiler message. `line` and `column` are 1-based when known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderMessage {
    pub severity: Severity,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl From<&wgpu::CompilationMessage> for ShaderMessage {
    fn from(msg: &wgpu::CompilationMessage) -> Self {
        let severity = match msg.message_type {
            wgpu::CompilationMessageType::Error => Severity::Error,
            wgpu::CompilationMessageType::Warning => Severity::Warning,
            wgpu::CompilationMessageType::Info => Severity::Info,
        };
        Self {
            severity,
            message: msg.message.clone(),
            line: msg.location.map(|l| l.line_number),
            column: msg.location.map(|l| l.line_position),
        }
    }
}

impl fmt::Display for ShaderMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{line}:{column}: {}", self.message),
            (Some(line), None) => write!(f, "{line}: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// A shader that failed to compile, with every error the compiler reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderError {
    pub label: String,
    pub messages: Vec<ShaderMessage>,
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shader {:?} failed to compile", self.label)?;
        for msg in &self.messages {
            write!(f, "\n  {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ShaderError {}

/// Log `messages` and fail if any of them is an error.
pub fn check(label: &str, messages: Vec<ShaderMessage>) -> Result<(), ShaderError> {
    let mut errors = Vec::new();
    for msg in messages {
        match msg.severity {
            Severity::Error => {
                log::error!("{label}: {msg}");
                errors.push(msg);
            }
            Severity::Warning => log::warn!("{label}: {msg}"),
            Severity::Info => log::info!("{label}: {msg}"),
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ShaderError {
            label: label.to_string(),
            messages: errors,
        })
    }
}

fn located(message: String, location: Option<naga::SourceLocation>) -> ShaderMessage {
    ShaderMessage {
        severity: Severity::Error,
        message,
        line: location.map(|l| l.line_number),
        column: location.map(|l| l.line_position),
    }
}

/// Parse and validate WGSL on the CPU, reporting the first error with its location.
pub fn validate(label: &str, source: &str) -> Result<(), ShaderError> {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(e) => {
            let msg = located(e.message().to_string(), e.location(source));
            return check(label, vec![msg]);
        }
    };
    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    match validator.validate(&module) {
        Ok(_) => Ok(()),
        Err(e) => {
            let msg = located(e.as_inner().to_string(), e.location(source));
            check(label, vec![msg])
        }
    }
}

pub async fn compile(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> anyhow::Result<wgpu::ShaderModule> {
    validate(label, source)?;
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let info = module.get_compilation_info().await;
    let messages = info.messages.iter().map(ShaderMessage::from).collect();
    check(label, messages)?;
    log::debug!("compiled shader {label}");
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(severity: Severity, text: &str) -> ShaderMessage {
        ShaderMessage {
            severity,
            message: text.to_string(),
            line: Some(3),
            column: Some(7),
        }
    }

    #[test]
    fn built_in_sources_validate() {
        for (label, source) in [("basic", BASIC), ("flat", FLAT), ("plasma", PLASMA)] {
            if let Err(e) = validate(label, source) {
                panic!("{e}");
            }
        }
    }

    #[test]
    fn syntax_errors_are_reported_with_location() {
        let err = validate("broken", "fn main( {").unwrap_err();
        assert_eq!(err.label, "broken");
        assert_eq!(err.messages.len(), 1);
        assert_eq!(err.messages[0].severity, Severity::Error);
        assert_eq!(err.messages[0].line, Some(1));
    }

    #[test]
    fn type_errors_are_reported() {
        let source = "fn f() -> f32 { return true; }";
        let err = validate("mistyped", source).unwrap_err();
        assert_eq!(err.messages.len(), 1);
        assert!(err.to_string().starts_with("shader \"mistyped\" failed to compile"));
    }

    #[test]
    fn warnings_alone_pass() {
        assert!(check("test", vec![msg(Severity::Warning, "unused")]).is_ok());
    }

    #[test]
    fn errors_are_collected_in_order() {
        let err = check(
            "test",
            vec![
                msg(Severity::Error, "first"),
                msg(Severity::Warning, "noise"),
                msg(Severity::Error, "second"),
            ],
        )
        .unwrap_err();
        assert_eq!(err.messages.len(), 2);
        assert_eq!(
            err.to_string(),
            "shader \"test\" failed to compile\n  3:7: first\n  3:7: second"
        );
    }
}
