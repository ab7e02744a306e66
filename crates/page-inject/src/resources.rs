//! Binding new resources and content streams to a page
//!
//! Insertions collect their resources in a [`ResourceSet`] and hand it to
//! [`commit`] together with the generated operators. `commit` reads and
//! validates everything it needs from the page before it writes anything,
//! so a failed insertion leaves the page untouched.

use crate::font::FontResource;
use crate::image::ImageXObject;
use crate::{PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;

/// Resource dictionary categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceCategory {
    Font,
    XObject,
    ExtGState,
    ColorSpace,
    Pattern,
    Shading,
    Properties,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 7] = [
        ResourceCategory::Font,
        ResourceCategory::XObject,
        ResourceCategory::ExtGState,
        ResourceCategory::ColorSpace,
        ResourceCategory::Pattern,
        ResourceCategory::Shading,
        ResourceCategory::Properties,
    ];

    /// Key in the Resources dictionary
    pub fn key(self) -> &'static str {
        match self {
            ResourceCategory::Font => "Font",
            ResourceCategory::XObject => "XObject",
            ResourceCategory::ExtGState => "ExtGState",
            ResourceCategory::ColorSpace => "ColorSpace",
            ResourceCategory::Pattern => "Pattern",
            ResourceCategory::Shading => "Shading",
            ResourceCategory::Properties => "Properties",
        }
    }

    /// Prefix of generated resource names
    pub fn prefix(self) -> &'static str {
        match self {
            ResourceCategory::Font => "F",
            ResourceCategory::XObject => "Img",
            ResourceCategory::ExtGState => "GS",
            ResourceCategory::ColorSpace => "CS",
            ResourceCategory::Pattern => "P",
            ResourceCategory::Shading => "Sh",
            ResourceCategory::Properties => "MC",
        }
    }
}

/// Where new content goes relative to the page's existing content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Drawn after (on top of) existing content
    #[default]
    Overlay,
    /// Drawn before (beneath) existing content
    Underlay,
}

impl Placement {
    pub fn from_overlay(overlay: bool) -> Self {
        if overlay {
            Placement::Overlay
        } else {
            Placement::Underlay
        }
    }
}

/// A resource object not yet written to the document
pub enum PendingResource {
    Font(FontResource),
    Image(ImageXObject),
    /// Any other object, added as-is
    Object(Object),
}

impl PendingResource {
    fn install(self, doc: &mut Document) -> ObjectId {
        match self {
            PendingResource::Font(font) => font.install(doc),
            PendingResource::Image(image) => image.install(doc),
            PendingResource::Object(object) => doc.add_object(object),
        }
    }
}

/// Scratch resources gathered during one insertion
///
/// Generated names carry a number from the document's object counter, so
/// they never repeat on a page across calls. Names the page already uses
/// are skipped.
pub struct ResourceSet {
    next: u32,
    taken: HashSet<String>,
    entries: Vec<Entry>,
}

struct Entry {
    category: ResourceCategory,
    name: String,
    resource: PendingResource,
    /// Allocated by [`ResourceSet::add`] rather than chosen by the caller
    generated: bool,
}

impl ResourceSet {
    /// Start numbering above every object id the document has used
    pub fn for_document(doc: &Document) -> Self {
        Self::starting_at(doc.max_id + 1)
    }

    /// Like [`for_document`](Self::for_document), also avoiding every name
    /// in the page's effective Resources
    pub fn for_page(doc: &Document, page_id: ObjectId) -> Result<Self> {
        let page = doc.get_dictionary(page_id)?;
        let resources = page_resources(doc, page)?;

        let mut taken = HashSet::new();
        for category in ResourceCategory::ALL {
            if let Ok(obj) = resources.get(category.key().as_bytes()) {
                let dict = resolve_dict(doc, obj)?;
                taken.extend(
                    dict.iter()
                        .map(|(name, _)| String::from_utf8_lossy(name).into_owned()),
                );
            }
        }

        Ok(Self {
            taken,
            ..Self::for_document(doc)
        })
    }

    pub fn starting_at(next: u32) -> Self {
        Self {
            next,
            taken: HashSet::new(),
            entries: Vec::new(),
        }
    }

    /// Register a resource under a freshly allocated name
    pub fn add(&mut self, category: ResourceCategory, resource: PendingResource) -> String {
        let mut name = format!("{}{}", category.prefix(), self.next);
        self.next += 1;
        while self.taken.contains(&name) {
            name = format!("{}{}", category.prefix(), self.next);
            self.next += 1;
        }
        self.entries.push(Entry {
            category,
            name: name.clone(),
            resource,
            generated: true,
        });
        name
    }

    /// Register a resource under a caller-chosen name; the last entry for a
    /// name wins, including over the page's own entry
    pub fn insert(&mut self, category: ResourceCategory, name: &str, resource: PendingResource) {
        self.entries.push(Entry {
            category,
            name: name.to_string(),
            resource,
            generated: false,
        });
    }

    /// Number the next generated name will carry
    pub fn next_number(&self) -> u32 {
        self.next
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names registered under a category, in registration order
    pub fn names(&self, category: ResourceCategory) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.category == category)
            .map(|entry| entry.name.as_str())
            .collect()
    }
}

/// Dictionary value of `obj`, following one reference
fn resolve_dict(doc: &Document, obj: &Object) -> Result<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Ok(dict.clone()),
        Object::Reference(id) => Ok(doc.get_dictionary(*id)?.clone()),
        _ => Err(PdfError::ParseError(
            "Expected a dictionary or a reference to one".to_string(),
        )),
    }
}

/// Resources inherited from the page tree, if the page has none of its own
fn inherited_resources(doc: &Document, page: &Dictionary) -> Result<Option<Dictionary>> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    // Same inheritance depth limit as MediaBox lookup
    for _ in 0..10 {
        let Some(id) = parent else { break };
        let node = doc.get_dictionary(id)?;
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(doc, resources).map(Some);
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(None)
}

/// The page's own Resources, else the inherited ones
fn page_resources(doc: &Document, page: &Dictionary) -> Result<Dictionary> {
    match page.get(b"Resources") {
        Ok(obj) => resolve_dict(doc, obj),
        Err(_) => Ok(inherited_resources(doc, page)?.unwrap_or_default()),
    }
}

/// Existing entries of the page's Contents, in draw order
enum ExistingContent {
    Refs(Vec<Object>),
    /// A direct stream, which must become an indirect object
    Inline(Stream),
}

fn existing_content(doc: &Document, page: &Dictionary) -> Result<ExistingContent> {
    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(ExistingContent::Refs(Vec::new())),
    };

    Ok(match contents {
        Object::Array(items) => ExistingContent::Refs(items.clone()),
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(items) => ExistingContent::Refs(items.clone()),
            Object::Stream(_) => ExistingContent::Refs(vec![Object::Reference(*id)]),
            _ => {
                return Err(PdfError::ParseError(
                    "Page Contents is neither a stream nor an array".to_string(),
                ))
            }
        },
        Object::Stream(stream) => ExistingContent::Inline(stream.clone()),
        Object::Null => ExistingContent::Refs(Vec::new()),
        _ => {
            return Err(PdfError::ParseError(
                "Page Contents is neither a stream nor an array".to_string(),
            ))
        }
    })
}

/// Attach `resources` and a new content stream to a page
///
/// Referenced Resources, category and Contents-array objects are copied into
/// the page before they are changed, so pages sharing them are unaffected.
/// Returns the id of the new content stream.
pub fn commit(
    doc: &mut Document,
    page_id: ObjectId,
    resources: ResourceSet,
    content: Vec<u8>,
    placement: Placement,
) -> Result<ObjectId> {
    // Read phase: nothing below may fail after the first write
    let mut page = doc.get_dictionary(page_id)?.clone();

    let mut resource_dict = page_resources(doc, &page)?;

    let mut categories = Vec::new();
    for category in ResourceCategory::ALL {
        if !resources.entries.iter().any(|entry| entry.category == category) {
            continue;
        }
        let dict = match resource_dict.get(category.key().as_bytes()) {
            Ok(obj) => resolve_dict(doc, obj)?,
            Err(_) => Dictionary::new(),
        };
        categories.push((category, dict));
    }

    // Generated names must never replace an existing entry
    for entry in resources.entries.iter().filter(|entry| entry.generated) {
        let clash = categories
            .iter()
            .any(|(c, dict)| *c == entry.category && dict.has(entry.name.as_bytes()));
        if clash {
            return Err(PdfError::InvalidArgument(format!(
                "Resource name {} is already used by the page",
                entry.name
            )));
        }
    }

    let existing = existing_content(doc, &page)?;

    // Write phase
    doc.max_id = doc.max_id.max(resources.next.saturating_sub(1));

    for entry in resources.entries {
        let id = entry.resource.install(doc);
        if let Some((_, dict)) = categories.iter_mut().find(|(c, _)| *c == entry.category) {
            dict.set(entry.name.as_bytes(), Object::Reference(id));
        }
    }
    for (category, dict) in categories {
        resource_dict.set(category.key(), Object::Dictionary(dict));
    }

    let mut items = match existing {
        ExistingContent::Refs(items) => items,
        ExistingContent::Inline(stream) => vec![Object::Reference(doc.add_object(stream))],
    };

    let stream_id = doc.add_object(Stream::new(Dictionary::new(), content));
    match placement {
        Placement::Overlay => items.push(Object::Reference(stream_id)),
        Placement::Underlay => items.insert(0, Object::Reference(stream_id)),
    }

    page.set("Resources", Object::Dictionary(resource_dict));
    page.set("Contents", Object::Array(items));
    doc.objects.insert(page_id, Object::Dictionary(page));

    Ok(stream_id)
}
