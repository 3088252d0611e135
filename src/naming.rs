//! Identifier casing for generated names.
//!
//! `camel_case` treats `_` and ` ` as word breaks and drops every other
//! non-alphabetic character, digits included. `pascal_case` is `camel_case`
//! with the first letter raised.

pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut raise_next = false;
    for c in name.chars() {
        if c == '_' || c == ' ' {
            raise_next = !out.is_empty();
            continue;
        }
        if !c.is_alphabetic() {
            continue;
        }
        if out.is_empty() {
            out.extend(c.to_lowercase());
        } else if raise_next {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        raise_next = false;
    }
    out
}

pub fn pascal_case(name: &str) -> String {
    let camel = camel_case(name);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => camel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_breaks_on_underscores_and_spaces() {
        assert_eq!(camel_case("first_name"), "firstName");
        assert_eq!(camel_case("zip code"), "zipCode");
        assert_eq!(camel_case("__private_id"), "privateId");
        assert_eq!(camel_case("Address"), "address");
    }

    #[test]
    fn camel_case_drops_non_alphabetic() {
        assert_eq!(camel_case("line2"), "line");
        assert_eq!(camel_case("x-ray"), "xray");
        assert_eq!(camel_case("$id"), "id");
        assert_eq!(camel_case("123"), "");
    }

    #[test]
    fn pascal_case_raises_first_letter() {
        assert_eq!(pascal_case("color"), "Color");
        assert_eq!(pascal_case("shipping_address"), "ShippingAddress");
        assert_eq!(pascal_case(""), "");
    }

    #[test]
    fn pascal_of_camel_is_idempotent_for_pascal_input() {
        for name in ["Base", "ShippingAddress", "HTTPServer", "X"] {
            assert_eq!(pascal_case(&camel_case(name)), name);
            assert_eq!(pascal_case(&pascal_case(name)), name);
        }
    }
}
