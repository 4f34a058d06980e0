//! Display names for stored codes.

use crate::models::wilayah::Wilayah;

/// Name of the option whose code is `code`, or the code itself when the
/// options are not loaded or do not contain it.
pub fn name_for_code(code: &str, options: &[Wilayah]) -> String {
    options
        .iter()
        .find(|item| item.code == code)
        .map(|item| item.name.clone())
        .unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_raw_code() {
        assert_eq!(name_for_code("99", &[]), "99");
        let options = [Wilayah::new("11", "Aceh")];
        assert_eq!(name_for_code("12", &options), "12");
    }

    #[test]
    fn resolves_known_code() {
        let options = [Wilayah::new("11", "Aceh"), Wilayah::new("12", "Sumatera Utara")];
        assert_eq!(name_for_code("12", &options), "Sumatera Utara");
    }
}
