//! BioMart XML query documents

use super::{MartQuery, SourceError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Build the `query` parameter for `martservice`.
///
/// Produces a TSV, header-less query against `dataset` with one filter
/// (values comma-joined) and one `<Attribute>` per requested attribute.
pub fn query_document(dataset: &str, query: &MartQuery) -> Result<String, SourceError> {
    let mut writer = Writer::new(Vec::new());
    let values = query.values.join(",");

    let query_start = BytesStart::new("Query").with_attributes([
        ("virtualSchemaName", "default"),
        ("formatter", "TSV"),
        ("header", "0"),
        ("uniqueRows", "0"),
        ("count", ""),
        ("datasetConfigVersion", "0.6"),
    ]);
    let dataset_start =
        BytesStart::new("Dataset").with_attributes([("name", dataset), ("interface", "default")]);
    let filter = BytesStart::new("Filter")
        .with_attributes([("name", &*query.filter), ("value", values.as_str())]);

    let mut events = vec![
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        Event::DocType(BytesText::from_escaped("Query")),
        Event::Start(query_start),
        Event::Start(dataset_start),
        Event::Empty(filter),
    ];
    for attribute in query.attributes.iter() {
        events.push(Event::Empty(
            BytesStart::new("Attribute").with_attributes([("name", attribute.as_str())]),
        ));
    }
    events.push(Event::End(BytesEnd::new("Dataset")));
    events.push(Event::End(BytesEnd::new("Query")));

    for event in events {
        writer
            .write_event(event)
            .map_err(|e| SourceError::Protocol(format!("Failed to build query document: {}", e)))?;
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| SourceError::Protocol(format!("Query document is not UTF-8: {}", e)))
}
