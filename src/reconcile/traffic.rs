//! Traffic-expression construction
//!
//! A rule matches when any domain in the DNS request appears in one of
//! its lists. The expression is one clause per list joined with `or`,
//! in input order; only `or` appears at the top level, so there is no
//! operator-precedence ambiguity to worry about.

use crate::api::GatewayList;

/// Build the match expression for a set of lists
///
/// An empty list set yields an empty string; callers must skip rule
/// creation in that case rather than submit an empty expression.
pub fn traffic_expression(lists: &[GatewayList]) -> String {
    lists
        .iter()
        .map(|list| format!("any(dns.domains[*] in ${})", list.id))
        .collect::<Vec<_>>()
        .join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(id: &str) -> GatewayList {
        GatewayList {
            id: id.to_string(),
            name: format!("List set by script {id}"),
            count: 0,
        }
    }

    #[test]
    fn test_single_list() {
        let lists = vec![list("aaaa")];
        assert_eq!(traffic_expression(&lists), "any(dns.domains[*] in $aaaa)");
    }

    #[test]
    fn test_preserves_input_order() {
        let lists = vec![list("a"), list("b"), list("c")];
        assert_eq!(
            traffic_expression(&lists),
            "any(dns.domains[*] in $a) or any(dns.domains[*] in $b) or any(dns.domains[*] in $c)"
        );
    }

    #[test]
    fn test_empty_set_is_empty_string() {
        assert_eq!(traffic_expression(&[]), "");
    }

    #[test]
    fn test_duplicate_list_produces_duplicate_clause() {
        let lists = vec![list("a"), list("a")];
        assert_eq!(
            traffic_expression(&lists),
            "any(dns.domains[*] in $a) or any(dns.domains[*] in $a)"
        );
    }
}
