//! Drupal field naming convention.
//!
//! A property `distanceInMiles` lives in table `field_data_field_distance_in_miles`
//! and its value column is `field_distance_in_miles_value`. Reference kinds
//! store the id of another node in `field_<name>_target_id` instead.

use crate::registry::PropertyKind;

const FIELD_PREFIX: &str = "field_";
const TABLE_PREFIX: &str = "field_data_";

/// Convert a medial-capitalized name to underscore spacing, so
/// `thisIsAProperty` becomes `this_is_a_property`
pub fn camel_to_underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Field name of a property (`field_<underscored>`)
pub fn field_name(property: &str) -> String {
    format!("{}{}", FIELD_PREFIX, camel_to_underscore(property))
}

/// Physical attribute column holding the property's value
pub fn column_for(property: &str, kind: PropertyKind) -> String {
    let suffix = match kind {
        PropertyKind::PlainValue => "_value",
        PropertyKind::UserReference
        | PropertyKind::EventReference
        | PropertyKind::ContainedEntity => "_target_id",
    };
    format!("{}{}", field_name(property), suffix)
}

/// Default attribute table of a property
pub fn table_for(property: &str) -> String {
    format!("{}{}", TABLE_PREFIX, field_name(property))
}
