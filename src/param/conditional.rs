//! Evaluation of discriminant-conditioned slots
//!
//! Decoding reads the discriminant's own slot first, then only the live
//! branch's parameter takes the shared slot; the other one keeps its default.

use super::Param;
use super::value::{ParamValue, SENTINEL, ScalarKind, is_absent, parse_scalar};
use crate::config::deployment::CfnParams;
use crate::error::{ConfigError, Result};
use crate::schema::conditional::{ConditionalSlot, Projection};
use crate::schema::{ParamSchema, SectionSchema};
use crate::section::Section;
use tracing::debug;

/// Discriminant value as carried by the deployment form
fn discriminant(owner: &SectionSchema, slot: &ConditionalSlot, cfn: &CfnParams) -> Result<String> {
    let schema = owner.param(slot.discriminant).ok_or_else(|| {
        ConfigError::configuration(format!(
            "Discriminant '{}' of slot '{}' is not declared in section '{}'",
            slot.discriminant, slot.slot, owner.key
        ))
    })?;

    let text = schema.cfn.map_or(SENTINEL, |own| cfn.get(own));
    if is_absent(text) {
        Ok(schema.default.text().unwrap_or_default())
    } else {
        Ok(text.trim().to_owned())
    }
}

/// Decode `schema` from the shared slot, or its default when another
/// parameter is live
///
/// # Errors
///
/// Returns a configuration error if the slot text does not coerce.
pub fn decode(
    owner: &SectionSchema,
    schema: &ParamSchema,
    scalar: ScalarKind,
    slot: &ConditionalSlot,
    cfn: &CfnParams,
) -> Result<ParamValue> {
    let discriminant = discriminant(owner, slot, cfn)?;
    let branch = slot.live_for(&discriminant);
    if branch.param != schema.key {
        debug!(
            "Slot '{}' belongs to '{}' when {} is '{}'; keeping default of '{}'",
            slot.slot, branch.param, slot.discriminant, discriminant, schema.key
        );
        return Ok(schema.default.clone());
    }

    let text = cfn.get(slot.slot).trim();
    match branch.projection {
        Projection::Direct => {
            if is_absent(text) {
                Ok(schema.default.clone())
            } else {
                parse_scalar(schema.key, scalar, text)
            }
        }
        Projection::Truncate => {
            if is_absent(text) {
                return Ok(schema.default.clone());
            }
            let number = text.parse::<f64>().map_err(|_| {
                ConfigError::configuration(format!(
                    "Deployment slot '{}' must be a number, got '{text}'",
                    slot.slot
                ))
            })?;
            #[expect(
                clippy::cast_possible_truncation,
                reason = "the integer part is the decoded value"
            )]
            let whole = number.trunc() as i64;
            Ok(ParamValue::Int(whole))
        }
        Projection::Flag { .. } => {
            if is_absent(text) {
                return Ok(ParamValue::Bool(false));
            }
            let size = text.parse::<f64>().map_err(|_| {
                ConfigError::configuration(format!(
                    "Deployment slot '{}' must be a number, got '{text}'",
                    slot.slot
                ))
            })?;
            Ok(ParamValue::Bool(size > 0.0))
        }
    }
}

/// Write the shared slot if `param` is the live branch
pub fn encode(param: &Param<'_>, slot: &ConditionalSlot, owner: &Section<'_>, out: &mut CfnParams) {
    let discriminant = owner
        .value(slot.discriminant)
        .and_then(ParamValue::text)
        .unwrap_or_default();
    let branch = slot.live_for(&discriminant);
    if branch.param != param.key() {
        return;
    }

    let text = match branch.projection {
        Projection::Direct | Projection::Truncate => param.slot_text(),
        Projection::Flag { size_param } => {
            if param.value().as_bool() == Some(true) {
                owner
                    .value(size_param)
                    .map_or_else(|| "0".to_owned(), ParamValue::slot_text)
            } else {
                "0".to_owned()
            }
        }
    };
    out.insert(slot.slot, text);
}
