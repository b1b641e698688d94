//! Construction-time validation of a codec's target type.

use std::collections::HashSet;

use crate::accessor::FieldAccessors;
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::formatter::FormatterRegistry;
use crate::schema::Schema;

fn unsupported(type_id: &str, reason: String) -> CodecError {
    CodecError::UnsupportedType {
        type_id: type_id.to_string(),
        reason,
    }
}

/// Validates that a codec can be built for `type_id` from its primary schema.
///
/// # Returns
/// `Ok(())` if every member of the primary schema is live, has an accessor
/// and a formatter, and the type is allowed by configuration.
pub(crate) fn validate_target<T>(
    type_id: &str,
    primary: &Schema,
    accessors: &FieldAccessors<T>,
    formatters: &FormatterRegistry,
    config: &CodecConfig,
) -> Result<()> {
    if config.is_blocked(type_id) {
        return Err(unsupported(type_id, "type is blocked by configuration".to_string()));
    }

    if primary.type_id() != type_id {
        return Err(unsupported(
            type_id,
            format!("primary schema belongs to '{}'", primary.type_id()),
        ));
    }

    if !primary.is_primary() {
        return Err(unsupported(
            type_id,
            format!("schema {:08x} is not primary", primary.fingerprint()),
        ));
    }

    let mut names = HashSet::with_capacity(primary.len());
    for member in primary.members() {
        if member.is_skip {
            return Err(unsupported(
                type_id,
                format!("primary schema marks member '{}' as skip", member.name),
            ));
        }

        if !names.insert(member.name.as_str()) {
            return Err(unsupported(
                type_id,
                format!("member '{}' declared twice", member.name),
            ));
        }

        if member.type_id == type_id {
            return Err(unsupported(
                type_id,
                format!("member '{}' inlines its own type", member.name),
            ));
        }

        if !accessors.contains(&member.name) {
            return Err(unsupported(
                type_id,
                format!("member '{}' has no accessor", member.name),
            ));
        }

        if !formatters.contains(&member.type_id) {
            return Err(unsupported(
                type_id,
                format!(
                    "member '{}' has type '{}' without a formatter",
                    member.name, member.type_id
                ),
            ));
        }
    }

    Ok(())
}
