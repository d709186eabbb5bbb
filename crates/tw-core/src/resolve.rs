//! Settings resolution.
//!
//! [`resolve`] folds user parameters over schema defaults:
//!
//! 1. Seed every option from its schema default.
//! 2. Overwrite `watchMode`, `rootPath` and `outputPath` when given.
//! 3. Resolve each known compiler option through its [`OptionSpec`].
//!    Unknown option names are skipped.
//!
//! The result always carries the full option set, and resolving the output
//! of [`CanonicalSettings::to_user_params`] gives the same settings back.
//!
//! [`OptionSpec`]: crate::OptionSpec

use camino::Utf8PathBuf;

use crate::error::ConfigError;
use crate::schema::{OptionName, Schema};
use crate::settings::{CanonicalSettings, CompilerOptions, UserParams};

/// Resolves `params` against `schema`.
///
/// # Errors
///
/// Returns [`ConfigError`] when an aliased option has an unrecognized token,
/// a direct option has a value of the wrong type, or `rootPath` /
/// `outputPath` is missing or empty.
///
/// # Examples
///
/// ```
/// use tw_core::{resolve, ModuleKind, Schema, UserParams};
///
/// let params = UserParams {
///     root_path: Some("src".into()),
///     output_path: Some("out".into()),
///     ..UserParams::default()
/// }
/// .with_option(tw_core::OptionName::ModuleType, serde_json::json!("AMD"));
///
/// let settings = resolve(Schema::standard(), &params)?;
/// assert!(settings.watch_mode());
/// assert_eq!(settings.compiler_options().module_kind(), ModuleKind::Amd);
/// # Ok::<(), tw_core::ConfigError>(())
/// ```
pub fn resolve(schema: &Schema, params: &UserParams) -> Result<CanonicalSettings, ConfigError> {
    let mut options = CompilerOptions::empty();
    for spec in schema.options() {
        options.insert(spec.name(), spec.default_value().clone());
    }

    for (key, raw) in &params.compiler_options {
        let Some(name) = OptionName::from_key(key) else {
            tracing::debug!(option = %key, "Ignoring unknown compiler option");
            continue;
        };
        let value = schema.spec(name).resolve(raw)?;
        options.insert(name, value);
    }

    let watch_mode = params.watch_mode.unwrap_or(schema.default_watch_mode());
    let root_path = required_path(params.root_path.as_ref(), "rootPath")?;
    let output_path = required_path(params.output_path.as_ref(), "outputPath")?;

    let settings = CanonicalSettings::new(watch_mode, root_path, output_path, options);
    tracing::debug!(?settings, "Resolved settings");
    Ok(settings)
}

fn required_path(
    path: Option<&Utf8PathBuf>,
    field: &'static str,
) -> Result<Utf8PathBuf, ConfigError> {
    path.filter(|p| !p.as_str().trim().is_empty())
        .cloned()
        .ok_or(ConfigError::missing_path(field))
}
