//! JSON-Pointer keyed error presentation.

use crate::errors::Errors;
use crate::params::Params;
use crate::path::to_pointer;
use indexmap::IndexMap;

/// Presentation helpers over anything holding an error collection.
pub trait ErrorFormatter {
    fn errors(&self) -> &Errors;

    /// Raw messages keyed by JSON Pointer (`/address/postal_code`).
    fn messages_by_pointer(&self) -> IndexMap<String, Vec<String>> {
        self.errors().messages_with(false, to_pointer)
    }

    /// Full messages keyed by JSON Pointer, joined into one display string.
    fn full_messages_by_pointer(&self) -> IndexMap<String, String> {
        self.errors()
            .messages_with(true, to_pointer)
            .into_iter()
            .map(|(k, messages)| (k, messages.join(", ")))
            .collect()
    }
}

impl ErrorFormatter for Errors {
    fn errors(&self) -> &Errors {
        self
    }
}

impl ErrorFormatter for Params {
    fn errors(&self) -> &Errors {
        Params::errors(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_keys() {
        let mut e = Errors::new();
        e.add("name", "can't be blank");
        e.add("address.postal_code", "is invalid");
        e.add("address.postal_code", "is too short (minimum is 8 characters)");

        let raw = e.messages_by_pointer();
        assert_eq!(raw.keys().collect::<Vec<_>>(), vec!["/name", "/address/postal_code"]);
        assert_eq!(raw["/name"], vec!["can't be blank"]);

        let full = e.full_messages_by_pointer();
        assert_eq!(
            full["/address/postal_code"],
            "Address postal code is invalid, Address postal code is too short (minimum is 8 characters)"
        );
    }
}
