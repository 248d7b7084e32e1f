// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CSS filter functions applied by a filter image.

use alloc::string::String;
use alloc::vec::Vec;

use crate::shadow::ShadowData;

/// One CSS filter function.
///
/// Amounts use the CSS conventions: `1.0` is the identity for the
/// multiplicative filters, `0.0` for the others.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOperation {
    /// `url(#filter)`: an SVG filter, possibly in an external document.
    Reference {
        /// The URL as written, including any fragment.
        url: String,
    },
    /// `grayscale(amount)`.
    Grayscale(f64),
    /// `sepia(amount)`.
    Sepia(f64),
    /// `saturate(amount)`.
    Saturate(f64),
    /// `hue-rotate(angle)`, in degrees.
    HueRotate(f64),
    /// `invert(amount)`.
    Invert(f64),
    /// `opacity(amount)`.
    Opacity(f64),
    /// `brightness(amount)`.
    Brightness(f64),
    /// `contrast(amount)`.
    Contrast(f64),
    /// `blur(radius)`, as a standard deviation in CSS pixels.
    Blur(f64),
    /// `drop-shadow(...)`.
    DropShadow(ShadowData),
}

impl FilterOperation {
    /// Returns `true` for `url()` filters.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference { .. })
    }

    /// For reference filters, the part of the URL before `#`.
    ///
    /// Returns `None` for same-document references and non-reference filters.
    #[must_use]
    pub fn external_document_url(&self) -> Option<&str> {
        let Self::Reference { url } = self else {
            return None;
        };
        let document = url.split_once('#').map_or(url.as_str(), |(doc, _)| doc);
        (!document.is_empty()).then_some(document)
    }

    /// Returns `true` if the filter can make opaque pixels transparent.
    #[must_use]
    pub fn affects_opacity(&self) -> bool {
        match self {
            Self::Opacity(amount) => *amount < 1.0,
            Self::Reference { .. } | Self::Blur(_) | Self::DropShadow(_) => true,
            _ => false,
        }
    }
}

/// An ordered list of filter functions, applied first to last.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterOperations(Vec<FilterOperation>);

impl FilterOperations {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an operation.
    pub fn push(&mut self, operation: FilterOperation) {
        self.0.push(operation);
    }

    /// The operations in application order.
    #[must_use]
    pub fn as_slice(&self) -> &[FilterOperation] {
        &self.0
    }

    /// Returns `true` if there are no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if any operation is a `url()` reference.
    #[must_use]
    pub fn has_reference_filter(&self) -> bool {
        self.0.iter().any(FilterOperation::is_reference)
    }
}

impl From<Vec<FilterOperation>> for FilterOperations {
    fn from(operations: Vec<FilterOperation>) -> Self {
        Self(operations)
    }
}

impl FromIterator<FilterOperation> for FilterOperations {
    fn from_iter<I: IntoIterator<Item = FilterOperation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn external_document_url_strips_fragment() {
        let external = FilterOperation::Reference {
            url: "filters.svg#blur".to_string(),
        };
        assert_eq!(external.external_document_url(), Some("filters.svg"));

        let local = FilterOperation::Reference {
            url: "#blur".to_string(),
        };
        assert_eq!(local.external_document_url(), None);
        assert_eq!(FilterOperation::Blur(2.0).external_document_url(), None);
    }

    #[test]
    fn reference_detection() {
        let ops: FilterOperations = [
            FilterOperation::Grayscale(1.0),
            FilterOperation::Reference {
                url: "f.svg#a".to_string(),
            },
        ]
        .into_iter()
        .collect();
        assert!(ops.has_reference_filter());
        assert!(!FilterOperations::new().has_reference_filter());
    }

    #[test]
    fn opacity_effects() {
        assert!(FilterOperation::Opacity(0.5).affects_opacity());
        assert!(!FilterOperation::Opacity(1.0).affects_opacity());
        assert!(!FilterOperation::Sepia(1.0).affects_opacity());
    }
}
