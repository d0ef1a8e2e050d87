//! Warehouse-safe name normalization
//!
//! Pipeline names and custom field labels become table and column names,
//! so they are reduced to lowercase ASCII snake case of at most 40 characters.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Maximum length of a normalized name, in characters
pub const MAX_NAME_LEN: usize = 40;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s]").unwrap());

/// Normalize free text into a warehouse-safe identifier
///
/// Decomposes accented characters and drops the marks, removes anything that
/// is not an ASCII letter, digit, underscore or whitespace, lowercases, turns
/// spaces into underscores and keeps the first [`MAX_NAME_LEN`] characters.
/// Underscores survive so that normalizing a normalized name is a no-op.
///
/// ```
/// use rdcrm_sync::naming::normalize_name;
///
/// assert_eq!(normalize_name("Funil de Vendas (Inbound)"), "funil_de_vendas_inbound");
/// assert_eq!(normalize_name("Região"), "regiao");
/// ```
pub fn normalize_name(text: &str) -> String {
    let without_accents: String = text.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    let cleaned = NON_ALPHANUMERIC.replace_all(&without_accents, "");

    cleaned
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .take(MAX_NAME_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Pipeline Principal", "pipeline_principal" ; "plain words")]
    #[test_case("Negociação Fechada", "negociacao_fechada" ; "accents stripped")]
    #[test_case("Qual o orçamento? (R$)", "qual_o_orcamento_r" ; "punctuation removed")]
    #[test_case("ÁÉÍÓÚ ãõ ç", "aeiou_ao_c" ; "uppercase accents")]
    #[test_case("", "" ; "empty")]
    #[test_case("a-b_c", "ab_c" ; "underscore kept")]
    #[test_case("funil_de_vendas", "funil_de_vendas" ; "already normalized")]
    #[test_case("２０２４ Meta", "2024_meta" ; "fullwidth digits compatibility decomposed")]
    fn test_normalize_name(input: &str, expected: &str) {
        assert_eq!(normalize_name(input), expected);
    }

    #[test]
    fn test_truncates_to_forty_characters() {
        let long = "Qual é o principal desafio da sua empresa hoje em dia";
        let normalized = normalize_name(long);
        assert_eq!(normalized.chars().count(), MAX_NAME_LEN);
        assert_eq!(normalized, "qual_e_o_principal_desafio_da_sua_empres");
    }

    #[test]
    fn test_keeps_other_whitespace() {
        assert_eq!(normalize_name("a\tb c"), "a\tb_c");
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "Funil de Vendas (Inbound)",
            "Qual é o principal desafio da sua empresa hoje em dia",
            "  espaços  duplos  ",
            "Ünïcödé – dash",
            "a\tb\nc",
            "snake_case já_usado",
            "Região Sul / Sudeste",
        ] {
            let once = normalize_name(input);
            assert_eq!(normalize_name(&once), once, "input: {input:?}");
        }
    }
}
