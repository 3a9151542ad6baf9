use minijinja::value::Value;
use minijinja::{Environment, context};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;

use super::control::ResponseControl;
use super::funcs;
use crate::config::TemplateConfig;

pub const DEFAULT_TEMPLATE_NAME: &str = "default";

const DEFAULT_TEMPLATE: &str = r#"{"code":{{ code }},"message":{{ message|jsonify }}{% if result is not none %},"result":{{ result|jsonify }}{% endif %}}"#;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("read template file {path} failure: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse template '{name}' failure: {source}")]
    Parse {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Values every template can reference.
#[derive(Debug, Clone, Serialize, Default)]
pub struct TemplateArgs {
    pub from: String,
    pub to: String,
    pub code: i64,
    pub message: String,
    pub result: Option<serde_json::Value>,
}

/// Named response templates, compiled once at startup.
///
/// A malformed template file is a startup error; at request time rendering
/// is best-effort and never fails the handler.
pub struct TemplateRegistry {
    env: Environment<'static>,
}

impl TemplateRegistry {
    pub fn from_config(
        templates: &HashMap<String, TemplateConfig>,
    ) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        funcs::register(&mut env);

        env.add_template_owned(
            DEFAULT_TEMPLATE_NAME.to_string(),
            DEFAULT_TEMPLATE.to_string(),
        )
        .map_err(|source| RenderError::Parse {
            name: DEFAULT_TEMPLATE_NAME.to_string(),
            source,
        })?;

        for (name, conf) in templates {
            let text =
                std::fs::read_to_string(&conf.template).map_err(|source| {
                    RenderError::ReadFile {
                        path: conf.template.display().to_string(),
                        source,
                    }
                })?;

            env.add_template_owned(name.clone(), text).map_err(|source| {
                RenderError::Parse {
                    name: name.clone(),
                    source,
                }
            })?;
        }

        Ok(Self { env })
    }

    /// Render the named template (falling back to the default when the name
    /// is absent or unknown) with the given args and control object.
    ///
    /// Execution failures are logged, never propagated: the control
    /// object's side effects stand and the textual output is empty.
    pub fn render(
        &self,
        name: Option<&str>,
        args: &TemplateArgs,
        control: &ResponseControl,
    ) -> String {
        let template = name
            .filter(|n| !n.is_empty())
            .and_then(|n| self.env.get_template(n).ok())
            .unwrap_or_else(|| {
                self.env
                    .get_template(DEFAULT_TEMPLATE_NAME)
                    .expect("default template registered at startup")
            });

        let ctx = context! {
            from => args.from.clone(),
            to => args.to.clone(),
            code => args.code,
            message => args.message.clone(),
            result => args.result.clone(),
            response => Value::from_object(control.clone()),
        };

        match template.render(ctx) {
            Ok(text) => text,
            Err(err) => {
                error!(template = template.name(), %err, "Template execution failed");
                String::new()
            }
        }
    }
}
