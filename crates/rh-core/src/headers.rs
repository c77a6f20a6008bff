//! Generic header list rewriting
//!
//! Used for plain request and response header modifiers.

use crate::evaluate::Evaluator;
use crate::profile::HeaderModifier;
use crate::types::{find_header, AppendMode, Header};

/// Apply one modifier to `headers` in place.
///
/// Returns `true` if the list changed.
pub fn apply_header_modifier(
    headers: &mut Vec<Header>,
    modifier: &HeaderModifier,
    evaluator: &Evaluator<'_>,
) -> bool {
    if !modifier.enabled {
        return false;
    }

    let existing = find_header(headers, &modifier.name);
    let old_value = existing.map(|idx| headers[idx].value.as_str()).unwrap_or("");
    let value = match evaluator.evaluate(&modifier.value, old_value) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("Skipping header modifier {:?}: {}", modifier.name, err);
            return false;
        }
    };

    if value.is_empty() && !modifier.send_empty_header {
        return match existing {
            Some(idx) => {
                log::trace!("remove header {}", headers[idx].name);
                headers.remove(idx);
                true
            }
            None => false,
        };
    }

    let idx = match existing {
        Some(idx) => idx,
        None => {
            log::trace!("add header {}", modifier.name);
            headers.push(Header::new(modifier.name.clone(), value));
            return true;
        }
    };

    let header = &mut headers[idx];
    let new_value = match modifier.append_mode {
        AppendMode::Overwrite => value,
        AppendMode::Append => format!("{}{}", header.value, value),
        AppendMode::CommaSeparatedAppend => format!("{},{}", header.value, value),
    };
    if header.value == new_value {
        return false;
    }
    log::trace!("set header {} ({:?})", header.name, modifier.append_mode);
    header.value = new_value;
    true
}

/// Apply `modifiers` in order to a copy of `headers`.
///
/// Returns `None` when the result is identical to the input.
pub fn rewrite_headers(
    headers: &[Header],
    modifiers: &[HeaderModifier],
    evaluator: &Evaluator<'_>,
) -> Option<Vec<Header>> {
    let mut out = headers.to_vec();
    for modifier in modifiers {
        apply_header_modifier(&mut out, modifier, evaluator);
    }
    if out.as_slice() == headers {
        None
    } else {
        Some(out)
    }
}
