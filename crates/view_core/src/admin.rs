//! Layout patch for the stand-in change page of the admin site.

use tracing::{debug, info};

use crate::{dom::Document, error::FlowError};

pub const STANDIN_ADMIN_TITLE: &str = "StandIn | Django site admin";

const MAIN_IMAGE_CLASS: &str = "field-display_main_image";
const UPLOADS_CLASS: &str = "field-list_uploads";

pub fn is_standin_admin_page(doc: &Document) -> bool {
    doc.elements_by_tag("title")
        .first()
        .is_some_and(|title| doc.text_content(*title).contains(STANDIN_ADMIN_TITLE))
}

/// Moves the uploads list next to the main image and tags the fieldset grid.
pub fn format_standin_admin(doc: &mut Document) -> Result<(), FlowError> {
    let main_image = first_with_class(doc, MAIN_IMAGE_CLASS)?;
    let uploads = first_with_class(doc, UPLOADS_CLASS)?;

    if let Some(readonly) = doc.find_in(uploads, |doc, node| doc.has_class(node, "readonly")) {
        doc.remove_class(readonly, "readonly");
    }
    let uploads_html = doc.inner_html(uploads);
    doc.append_html(main_image, &uploads_html);
    doc.detach(uploads);
    debug!("merged uploads into main image block");

    let fieldset = doc
        .elements_by_tag("fieldset")
        .first()
        .copied()
        .ok_or_else(|| FlowError::missing("fieldset"))?;
    let grid = doc
        .parent(fieldset)
        .ok_or_else(|| FlowError::missing("fieldset parent"))?;
    doc.add_class(grid, "fieldsets");

    let submit_row = first_with_class(doc, "submit-row")?;
    doc.add_class(submit_row, "col");
    doc.add_class(submit_row, "col6");

    info!("stand-in admin layout applied");
    Ok(())
}

fn first_with_class(doc: &Document, class: &str) -> Result<crate::dom::NodeId, FlowError> {
    doc.elements_by_class(class)
        .first()
        .copied()
        .ok_or_else(|| FlowError::missing(format!(".{class}")))
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
