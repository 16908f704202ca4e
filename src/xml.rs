//! Small helpers over the sxd-document DOM shared by the model readers.

use nalgebra::Vector3;
use sxd_document::dom;

use crate::model_error::ModelError;

/// Child elements with the given local name, in document order.
pub(crate) fn children<'d>(element: dom::Element<'d>, tag: &'static str) -> impl Iterator<Item = dom::Element<'d>> {
    element
        .children()
        .into_iter()
        .filter_map(|c| c.element())
        .filter(move |e| e.name().local_part() == tag)
}

/// First child element with the given local name.
pub(crate) fn child<'d>(element: dom::Element<'d>, tag: &'static str) -> Option<dom::Element<'d>> {
    children(element, tag).next()
}

/// The document element of a parsed package.
pub(crate) fn root_element<'d>(document: &dom::Document<'d>) -> Result<dom::Element<'d>, ModelError> {
    document
        .root()
        .children()
        .into_iter()
        .find_map(|e| e.element())
        .ok_or_else(|| ModelError::Xml("No root element found".into()))
}

pub(crate) fn attribute<'d>(element: dom::Element<'d>, name: &str) -> Option<&'d str> {
    element.attribute(name).map(|a| a.value())
}

/// Attribute that must be present, `context` naming the element for the error message.
pub(crate) fn required_attribute<'d>(element: dom::Element<'d>, name: &str, context: &str)
                                     -> Result<&'d str, ModelError> {
    attribute(element, name).ok_or_else(|| ModelError::MissingField(format!("{} of {}", name, context)))
}

/// Whitespace separated numbers.
pub(crate) fn parse_floats(value: &str) -> Result<Vec<f64>, ModelError> {
    value
        .split_whitespace()
        .map(|v| v.parse::<f64>().map_err(|_| ModelError::Parse(format!("'{}' is not a number", v))))
        .collect()
}

/// Exactly three whitespace separated numbers.
pub(crate) fn parse_vector3(value: &str) -> Result<Vector3<f64>, ModelError> {
    match parse_floats(value)?.as_slice() {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        other => Err(ModelError::Parse(format!(
            "'{}' must contain exactly three values, found {}", value, other.len()
        ))),
    }
}

/// Optional three-component attribute.
pub(crate) fn vector3_attribute(element: dom::Element, name: &str) -> Result<Option<Vector3<f64>>, ModelError> {
    attribute(element, name).map(parse_vector3).transpose()
}
