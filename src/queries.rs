//! Master search-query templates and keyword substitution.
//!
//! Templates carry `[key]` placeholders resolved by exact substring
//! replacement against the per-row keyword mapping. A placeholder with no
//! matching key stays in the query verbatim.

use crate::sheet::Record;

pub const PEST_TEMPLATES: &[&str] = &[
    "[nombre_común] en plantas de [especies_afectadas] - [Subtipo] ([Nombre Científico]) en [parte_afectada]. El daño visible incluye [Daño]",
    "Síntomas de infección por [nombre_común] en [especies_afectadas] - [Subtipo] ([Nombre Científico])",
    "Primer plano de la infestación de [Subtipo] ([Nombre Científico]) en [especies_afectadas]",
    "Vista detallada de [nombre_común] en [especies_afectadas] - [Subtipo] ([Nombre Científico]). [parte_afectada] presenta [Daño]",
    "Infestación de [Subtipo] ([Nombre Científico]) en [especies_afectadas], afectando [parte_afectada]. Indicios incluyen [Daño]",
    "Síntomas de [nombre_común] ([Nombre Científico]) en [especies_afectadas], afectando específicamente [parte_afectada]",
    "Imágenes de alta calidad de [nombre_común] que afectan [parte_afectada] de plantas cítricas, mostrando [Daño]",
    "[nombre_común] que afecta a [especies_afectadas] - [Subtipo] ([Nombre Científico]), afectando [parte_afectada]",
];

// The last template's capitalized `[Disorder]`/`[Characteristic]` match no
// keyword key; their bracket text survives substitution unchanged.
pub const DEFICIENCY_TEMPLATES: &[&str] = &[
    "Imágenes de [disorder] mostrando [characteristic] en [affected_part]",
    "Síntomas de [disorder] con [characteristic] visible en [affected_part]",
    "Primer plano de [disorder] con [characteristic] en [affected_part]",
    "[characteristic] como síntoma de [disorder] que afecta [affected_part]",
    "Vista detallada de [disorder] con [characteristic] afectando [affected_part]",
    "Imágenes de alta resolución de [disorder] y [characteristic] en [affected_part]",
    "[disorder] causando [characteristic] en [affected_part]",
    "Signos visibles de [Disorder] - [Characteristic] en [affected_part]",
];

pub fn templates_for(record: &Record) -> &'static [&'static str] {
    match record {
        Record::Pest(_) => PEST_TEMPLATES,
        Record::Deficiency(_) => DEFICIENCY_TEMPLATES,
    }
}

/// Resolve every `[key]` occurrence in each template, in template order.
/// Pure; unmatched placeholders are left alone and values are never
/// re-scanned for placeholders of their own.
pub fn generate_queries(templates: &[&str], keywords: &[(&str, String)]) -> Vec<String> {
    templates
        .iter()
        .map(|template| {
            let mut query = (*template).to_string();
            for (key, value) in keywords {
                query = query.replace(&format!("[{key}]"), value);
            }
            query
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(pairs: &[(&'static str, &str)]) -> Vec<(&'static str, String)> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_every_matching_placeholder_replaced() {
        let queries = generate_queries(
            &["[a] and [b] and [a]"],
            &keywords(&[("a", "uno"), ("b", "dos")]),
        );
        assert_eq!(queries, vec!["uno and dos and uno"]);
    }

    #[test]
    fn test_unmatched_placeholder_stays_verbatim() {
        let queries = generate_queries(&["[a] with [missing]"], &keywords(&[("a", "uno")]));
        assert_eq!(queries, vec!["uno with [missing]"]);
    }

    #[test]
    fn test_empty_mapping_is_identity() {
        let queries = generate_queries(&["[a] [b]"], &[]);
        assert_eq!(queries, vec!["[a] [b]"]);
    }

    #[test]
    fn test_substituted_brackets_are_inert() {
        // A value containing bracket text that is not a key must survive.
        let queries = generate_queries(&["[a]"], &keywords(&[("a", "[not a key]")]));
        assert_eq!(queries, vec!["[not a key]"]);
    }

    #[test]
    fn test_template_order_preserved() {
        let queries = generate_queries(&["first [a]", "second [a]"], &keywords(&[("a", "x")]));
        assert_eq!(queries, vec!["first x", "second x"]);
    }

    #[test]
    fn test_deficiency_capitalized_placeholders_never_match() {
        let kw = keywords(&[
            ("disorder", "Deficiencia de Hierro"),
            ("characteristic", "clorosis"),
            ("affected_part", "hojas"),
        ]);
        let queries = generate_queries(DEFICIENCY_TEMPLATES, &kw);
        assert_eq!(queries.len(), 8);
        // Template 8 keeps its capitalized brackets; the rest resolve fully.
        assert!(queries[7].contains("[Disorder]"));
        assert!(queries[7].contains("[Characteristic]"));
        assert!(queries[7].contains("hojas"));
        for query in &queries[..7] {
            assert!(!query.contains('['), "unresolved placeholder in {query}");
        }
    }
}
