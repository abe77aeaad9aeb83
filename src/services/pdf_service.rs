//! PDF operations on stored documents: merge, page removal and signing stamp.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::services::signature_image::SignatureImage;

fn pdf_err(context: &str, e: lopdf::Error) -> AppError {
    AppError::Pdf(format!("{}: {}", context, e))
}

fn save(doc: &mut Document) -> Result<Vec<u8>, AppError> {
    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| AppError::Pdf(format!("Failed to write PDF: {}", e)))?;
    Ok(out)
}

fn type_name(object: &Object) -> Option<&[u8]> {
    object
        .as_dict()
        .ok()
        .and_then(|d| d.get(b"Type").ok())
        .and_then(|t| t.as_name().ok())
}

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];
const MAX_TREE_DEPTH: usize = 32;

/// The page dictionary with inherited attributes copied onto it, so the page
/// no longer depends on the page tree it came from.
fn detached_page(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut page = doc.get_dictionary(page_id).ok()?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(node) = parent.and_then(|id| doc.get_dictionary(id).ok()) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Some(page)
}

/// Concatenates the given documents in order. Parts that cannot be parsed
/// are skipped; an error is returned only when no page survives.
pub fn merge(parts: &[(String, Vec<u8>)]) -> Result<Vec<u8>, AppError> {
    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for (name, bytes) in parts {
        let mut doc = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(part = %name, error = %e, "Skipping unreadable PDF part");
                continue;
            }
        };
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            if let Some(page) = detached_page(&doc, page_id) {
                pages.push((page_id, page));
            }
        }
        objects.extend(doc.objects);
    }

    if pages.is_empty() {
        return Err(AppError::Pdf("Client packet PDF contains no pages".to_string()));
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Dictionary)> = None;

    for (id, object) in objects {
        let kind = type_name(&object).map(<[u8]>::to_vec);
        match kind.as_deref() {
            Some(b"Catalog") => {
                if catalog.is_none() {
                    if let Ok(dict) = object.as_dict() {
                        catalog = Some((id, dict.clone()));
                    }
                }
            }
            Some(b"Pages") | Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => {}
            _ => {
                merged.objects.insert(id, object);
            }
        }
    }

    let pages_id = (max_id, 0);
    let (catalog_id, mut catalog_dict) =
        catalog.unwrap_or_else(|| ((max_id + 1, 0), dictionary! { "Type" => "Catalog" }));

    let mut kids = Vec::with_capacity(pages.len());
    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        merged.objects.insert(id, Object::Dictionary(page));
        kids.push(Object::Reference(id));
    }

    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    catalog_dict.set("Pages", pages_id);
    catalog_dict.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(catalog_dict));

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
    merged.renumber_objects();
    merged.compress();
    save(&mut merged)
}

/// Removes 1-based page numbers; numbers outside the document are ignored.
pub fn remove_pages(bytes: &[u8], pages_to_remove: &[i64]) -> Result<Vec<u8>, AppError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| pdf_err("Failed to read PDF", e))?;
    let total = doc.get_pages().len() as i64;

    let mut remove: Vec<u32> = pages_to_remove
        .iter()
        .copied()
        .filter(|p| (1..=total).contains(p))
        .map(|p| p as u32)
        .collect();
    remove.sort_unstable();
    remove.dedup();

    if remove.len() as i64 >= total {
        return Err(AppError::Validation("No pages left in packet after removal".to_string()));
    }

    doc.delete_pages(&remove);
    doc.prune_objects();
    save(&mut doc)
}

/// PDF text string in UTF-16BE with a byte order mark, so Hebrew survives.
fn text_string(value: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(value.encode_utf16().flat_map(|u| u.to_be_bytes()));
    Object::String(bytes, StringFormat::Hexadecimal)
}

const SIGNATURE_XOBJECT: &[u8] = b"ClientSignature";

fn page_annotations<'a>(doc: &'a Document, page: &'a Dictionary) -> Vec<&'a Dictionary> {
    let annots = match page.get(b"Annots") {
        Ok(Object::Reference(id)) => doc.get_object(*id).and_then(Object::as_array).ok(),
        Ok(Object::Array(items)) => Some(items),
        _ => None,
    };
    annots
        .into_iter()
        .flatten()
        .filter_map(|item| match item {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        })
        .collect()
}

/// Widgets carry the field type themselves or inherit it from their field.
fn is_signature_field(doc: &Document, annotation: &Dictionary) -> bool {
    let mut node = Some(annotation);
    for _ in 0..MAX_TREE_DEPTH {
        let Some(dict) = node else {
            return false;
        };
        if let Ok(field_type) = dict.get(b"FT").and_then(Object::as_name) {
            return field_type == b"Sig";
        }
        node = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    false
}

/// Normalized `[x, y, width, height]` of an annotation rectangle.
fn annotation_rect(annotation: &Dictionary) -> Option<[f32; 4]> {
    let rect = annotation.get(b"Rect").and_then(Object::as_array).ok()?;
    let values: Vec<f32> = rect.iter().filter_map(|v| v.as_float().ok()).collect();
    let [x1, y1, x2, y2] = <[f32; 4]>::try_from(values).ok()?;
    let (width, height) = ((x2 - x1).abs(), (y2 - y1).abs());
    (width > 0.0 && height > 0.0).then(|| [x1.min(x2), y1.min(y2), width, height])
}

/// Every signature field on every page, as (page, rectangle).
pub(crate) fn signature_fields(doc: &Document) -> Vec<(ObjectId, [f32; 4])> {
    let mut fields = Vec::new();
    for (_, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        for annotation in page_annotations(doc, page) {
            if is_signature_field(doc, annotation) {
                if let Some(rect) = annotation_rect(annotation) {
                    fields.push((page_id, rect));
                }
            }
        }
    }
    fields
}

/// Image placement inside `rect`: scaled to fit, aspect kept, centered.
fn fit_into(rect: [f32; 4], image_width: f32, image_height: f32) -> [f32; 4] {
    let [x, y, width, height] = rect;
    let scale = (width / image_width).min(height / image_height);
    let (w, h) = (image_width * scale, image_height * scale);
    [x + (width - w) / 2.0, y + (height - h) / 2.0, w, h]
}

fn draw_signature(doc: &mut Document, page_id: ObjectId, placement: [f32; 4]) -> Result<(), AppError> {
    let [x, y, w, h] = placement;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w.into(), 0.0f32.into(), 0.0f32.into(), h.into(), x.into(), y.into()],
            ),
            Operation::new("Do", vec![Object::Name(SIGNATURE_XOBJECT.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    doc.add_to_page_content(page_id, content)
        .map_err(|e| pdf_err("Failed to draw signature", e))
}

/// Draws the client's signature into every signature field and records the
/// signer in the document information dictionary.
pub fn stamp_signature(
    bytes: &[u8],
    signer: &str,
    signed_at: DateTime<Utc>,
    signature_file: &str,
    image: &SignatureImage,
) -> Result<Vec<u8>, AppError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| pdf_err("Failed to read PDF", e))?;

    let fields = signature_fields(&doc);
    if fields.is_empty() {
        warn!("Packet has no signature fields; only the information dictionary is stamped");
    } else {
        let image_id = image.add_to(&mut doc);
        let (image_width, image_height) = (image.width as f32, image.height as f32);
        for (page_id, rect) in &fields {
            doc.add_xobject(*page_id, SIGNATURE_XOBJECT, image_id)
                .map_err(|e| pdf_err("Failed to attach signature image", e))?;
            draw_signature(&mut doc, *page_id, fit_into(*rect, image_width, image_height))?;
        }
        info!(fields = fields.len(), "Signature drawn into packet fields");
    }

    let mut info = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_dictionary(id))
        .map(|d| d.clone())
        .unwrap_or_else(|_| Dictionary::new());

    info.set("SignedBy", text_string(signer));
    info.set("SignedAt", text_string(&signed_at.to_rfc3339()));
    info.set("SignatureImage", text_string(signature_file));
    info.set("ModDate", Object::string_literal(signed_at.format("D:%Y%m%d%H%M%SZ").to_string()));

    let info_id = doc.add_object(Object::Dictionary(info));
    doc.trailer.set("Info", info_id);
    save(&mut doc)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::Stream;

    use super::*;

    pub fn page_count(bytes: &[u8]) -> Result<usize, AppError> {
        let doc = Document::load_mem(bytes).map_err(|e| pdf_err("Failed to read PDF", e))?;
        Ok(doc.get_pages().len())
    }

    /// Minimal document with `pages` empty A4 pages.
    pub fn blank_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for _ in 0..pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn ints(values: &[i64]) -> Vec<Object> {
        values.iter().copied().map(Object::Integer).collect()
    }

    /// One page whose box and resources live only on the page tree node.
    pub fn pdf_with_inherited_box(side: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => ints(&[0, 0, side, side]),
                "Resources" => dictionary! { "ProcSet" => vec![Object::Name(b"PDF".to_vec())] },
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    /// One A4 page with a signature widget at (100, 100)-(300, 150).
    pub fn pdf_with_signature_field() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let widget_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Sig",
            "T" => Object::string_literal("client_signature"),
            "Rect" => ints(&[100, 100, 300, 150]),
        });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => ints(&[0, 0, 595, 842]),
            "Annots" => vec![Object::Reference(widget_id)],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }
}
