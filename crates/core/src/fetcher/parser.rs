//! Parsing of BTDigg search result pages.

use scraper::{ElementRef, Html, Selector};

use super::size::parse_size;
use super::FetchError;
use crate::record::{InfoHash, TorrentFile, TorrentRecord};

/// Parse a search result page into a record.
///
/// Returns `Ok(None)` when the page carries no torrent details, which is how
/// the index reports an unknown info hash.
pub fn parse_search_page(
    info_hash: &InfoHash,
    html: &str,
) -> Result<Option<TorrentRecord>, FetchError> {
    let document = Html::parse_document(html);
    let cells = selector("td")?;

    let Some(name) = labelled_value(&document, &cells, "Name:") else {
        return Ok(None);
    };

    let size = labelled_value(&document, &cells, "Size:")
        .ok_or_else(|| FetchError::Parse("missing Size: cell".to_string()))?;
    let age = labelled_value(&document, &cells, "Age:")
        .ok_or_else(|| FetchError::Parse("missing Age: cell".to_string()))?;

    Ok(Some(TorrentRecord {
        info_hash: info_hash.clone(),
        name,
        size: parse_size(&size),
        age,
        files: parse_files(&document)?,
    }))
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::Parse(format!("bad selector {:?}: {}", css, e)))
}

/// Text of the `td` right after the `td` whose text is `label`.
fn labelled_value(document: &Html, cells: &Selector, label: &str) -> Option<String> {
    document
        .select(cells)
        .find(|cell| cell.text().collect::<String>().trim() == label)
        .and_then(|cell| next_sibling_element(cell, "td"))
        .map(|value| value.text().collect::<String>().trim().to_string())
}

fn next_sibling_element<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == tag)
}

fn parse_files(document: &Html) -> Result<Vec<TorrentFile>, FetchError> {
    let file_icons = selector("div.fa.fa-file-video-o")?;
    let mut files = Vec::new();

    for icon in document.select(&file_icons) {
        let name: String = icon
            .children()
            .filter_map(|node| node.value().as_text())
            .map(|text| &**text)
            .collect();

        let size = next_sibling_element(icon, "span")
            .map(|span| span.text().collect::<String>())
            .ok_or_else(|| {
                FetchError::Parse(format!("missing size for file {:?}", name.trim()))
            })?;

        files.push(TorrentFile {
            name: name.trim().to_string(),
            size: parse_size(&size),
        });
    }

    Ok(files)
}
