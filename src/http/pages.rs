//! Minimal HTML pages. The data a browser needs is embedded as JSON; the
//! rendering itself is left to client-side scripts.

use serde::Serialize;
use serde_json::json;

use crate::api::ObjectDetail;
use crate::core::PAGINATION_UNIT;
use crate::storage::catalog_store::CatalogTable;

/// Serialize `value` for embedding inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn document(title: &str, script_id: &str, payload: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n\
         <body>\n<h1>{title}</h1>\n<div id=\"app\"></div>\n\
         <script id=\"{script_id}\" type=\"application/json\">{payload}</script>\n</body>\n</html>\n",
        title = escape_html(title),
        script_id = script_id,
        payload = payload,
    )
}

/// Catalog browser shell.
pub fn index_page(table: &CatalogTable, pure: bool, filter: &str) -> String {
    let payload = json!({
        "columns": table.columns(),
        "total_rows": table.len(),
        "page_size": PAGINATION_UNIT,
        "filter": filter,
        "pure": pure,
    });
    document("VarWISE catalog", "catalog-config", &script_json(&payload))
}

/// Object detail page.
pub fn object_page(detail: &ObjectDetail, pure: bool) -> String {
    let payload = json!({
        "detail": detail,
        "pure": pure,
    });
    document(&detail.title, "object-detail", &script_json(&payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Scalar;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_index_embeds_columns() {
        let table = CatalogTable::from_rows(
            vec!["cluster_id".into(), "w1mag".into()],
            vec![vec![Scalar::Int(1), Scalar::Float(14.0)]],
        )
        .unwrap();
        let page = index_page(&table, true, "w1mag<15 </script>");
        assert!(page.contains(r#""columns":["cluster_id","w1mag"]"#));
        assert!(page.contains(r#""page_size":20"#));
        assert!(!page.contains("15 </script>"));
    }
}
