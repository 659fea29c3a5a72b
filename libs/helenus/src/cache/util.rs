use super::Facet;

/// Schema named by the fixed table facet of a facet list
pub fn schema_name(facets: &[Facet]) -> Option<&str> {
    facets.iter().find_map(Facet::table_name)
}

/// Cache keys for every non-fixed facet, prefixed with the schema name
pub fn flatten(schema: &str, facets: &[Facet]) -> Vec<String> {
    facets
        .iter()
        .filter(|f| !f.is_fixed())
        .map(|f| format!("{schema}.{}", f.key()))
        .collect()
}

pub fn schema_prefix(schema: &str) -> String {
    format!("{schema}.")
}
