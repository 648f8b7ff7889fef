use quotequest_pipeline::Record;
use serde_json::{json, Value};
use tracing::warn;

/// Request body for one page of paragraph hits
pub fn search_payload(query: &str, filter: &str, from: usize, size: usize) -> Value {
    json!({
        "query": {
            "bool": {
                "must": {
                    "query_string": {
                        "query": query,
                        "fields": ["content_en.en_norm^10", "content_en.en_norm_stem"],
                        "default_operator": "AND"
                    }
                },
                "should": {
                    "multi_match": {
                        "query": query,
                        "type": "phrase",
                        "operator": "and",
                        "fields": ["content_en.en_norm^100", "content_en.en_norm_stem^50"]
                    }
                },
                "filter": {
                    "term": { "unit": "para" }
                }
            }
        },
        "post_filter": {
            "bool": {
                "filter": [{ "term": { "keywords": filter } }]
            }
        },
        "sort": { "_score": "desc" },
        "from": from,
        "size": size
    })
}

/// One page of results
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Hits returned by the service, usable or not
    pub hits: usize,

    pub records: Vec<Record>,
}

/// Extract records from a search response; hits without a location or text are skipped
pub fn parse_hits(body: &Value) -> SearchPage {
    let hits = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut records = Vec::with_capacity(hits.len());
    for hit in hits {
        let source = &hit["_source"];
        let location = source["location"].as_str().filter(|s| !s.trim().is_empty());
        let text = source["content_en"].as_str();

        match (location, text) {
            (Some(location), Some(text)) => {
                let mut record = Record::new(location, text);
                record.title = source["title"].as_str().map(str::to_string);
                records.push(record);
            }
            _ => warn!("Skipping hit without location or text: {}", hit["_id"]),
        }
    }

    SearchPage {
        hits: hits.len(),
        records,
    }
}
