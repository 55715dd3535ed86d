//! Forensic indicators: active content, external references and payloads.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use crate::analysis::filespec_name;
use crate::document::DocumentContext;
use crate::model::{Dict, DictExt, ObjectRef, PdfValue};

const PREVIEW_CHARS: usize = 80;

/// One indicator. `object` is the indirect object the dictionary lives in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    JavaScript {
        object: Option<ObjectRef>,
        length: usize,
        preview: String,
    },
    Uri {
        object: Option<ObjectRef>,
        uri: Option<String>,
    },
    Launch {
        object: Option<ObjectRef>,
        target: Option<String>,
    },
    SubmitForm {
        object: Option<ObjectRef>,
        url: Option<String>,
    },
    RemoteGoTo {
        object: Option<ObjectRef>,
        file: Option<String>,
    },
    Rendition {
        object: Option<ObjectRef>,
    },
    OpenAction {
        target: String,
    },
    AdditionalActions {
        object: Option<ObjectRef>,
        triggers: Vec<String>,
    },
    NamedJavaScript {
        name: String,
    },
    EmbeddedFile {
        name: String,
    },
    FileSpecWithPayload {
        object: Option<ObjectRef>,
        filename: Option<String>,
    },
    XfaForm {
        object: Option<ObjectRef>,
    },
}

impl Finding {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::JavaScript { .. } => "java_script",
            Self::Uri { .. } => "uri",
            Self::Launch { .. } => "launch",
            Self::SubmitForm { .. } => "submit_form",
            Self::RemoteGoTo { .. } => "remote_go_to",
            Self::Rendition { .. } => "rendition",
            Self::OpenAction { .. } => "open_action",
            Self::AdditionalActions { .. } => "additional_actions",
            Self::NamedJavaScript { .. } => "named_java_script",
            Self::EmbeddedFile { .. } => "embedded_file",
            Self::FileSpecWithPayload { .. } => "file_spec_with_payload",
            Self::XfaForm { .. } => "xfa_form",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForensicReport {
    pub findings: Vec<Finding>,
    pub summary: BTreeMap<&'static str, usize>,
}

/// Scan every in-use object, plus document-level entries of the catalog.
pub fn forensics(ctx: &DocumentContext) -> ForensicReport {
    let mut found = BTreeSet::new();

    for id in ctx.in_use_refs() {
        let Some(object) = ctx.resolve(id) else { continue };
        let mut values: Vec<&PdfValue> = vec![object.as_ref()];
        while let Some(value) = values.pop() {
            match value {
                PdfValue::Array(items) => values.extend(items),
                PdfValue::Dict(dict) => {
                    inspect_dict(ctx, Some(id), dict, &mut found);
                    values.extend(dict.values());
                }
                PdfValue::Stream(stream) => {
                    inspect_dict(ctx, Some(id), &stream.dict, &mut found);
                    values.extend(stream.dict.values());
                }
                _ => {}
            }
        }
    }

    if let Some(catalog) = ctx.catalog()
        && let Some(dict) = catalog.as_dict()
    {
        document_level(ctx, dict, &mut found);
    }

    let findings: Vec<Finding> = found.into_iter().collect();
    let summary = findings.iter().map(Finding::kind).counts().into_iter().collect();
    debug!(findings = findings.len(), "forensic scan done");
    ForensicReport { findings, summary }
}

fn inspect_dict(
    ctx: &DocumentContext,
    object: Option<ObjectRef>,
    dict: &Dict,
    found: &mut BTreeSet<Finding>,
) {
    let text = |key: &str| ctx.get(dict, key).and_then(|v| v.as_text());
    let file = |key: &str| dict.get(key).and_then(|v| filespec_name(ctx, v));

    if let Some(action) = dict.get_name("S") {
        let finding = match action {
            "JavaScript" => {
                let script = ctx.get(dict, "JS").map(|js| match &*js {
                    PdfValue::Stream(s) => ctx.decode_stream(s).data,
                    other => other.as_string().map(<[u8]>::to_vec).unwrap_or_default(),
                });
                let script = script.unwrap_or_default();
                Some(Finding::JavaScript {
                    object,
                    length: script.len(),
                    preview: preview(&script),
                })
            }
            "URI" => Some(Finding::Uri {
                object,
                uri: text("URI"),
            }),
            "Launch" => Some(Finding::Launch {
                object,
                target: file("F").or_else(|| {
                    let win = ctx.get(dict, "Win")?;
                    win.as_dict().and_then(|w| w.get_text("F"))
                }),
            }),
            "SubmitForm" => Some(Finding::SubmitForm {
                object,
                url: file("F"),
            }),
            "GoToR" => Some(Finding::RemoteGoTo {
                object,
                file: file("F"),
            }),
            "Rendition" => Some(Finding::Rendition { object }),
            _ => None,
        };
        found.extend(finding);
    }

    if let Some(aa) = ctx.get(dict, "AA")
        && let Some(triggers) = aa.as_dict()
        && !triggers.is_empty()
    {
        found.insert(Finding::AdditionalActions {
            object,
            triggers: triggers.keys().cloned().collect(),
        });
    }

    if dict.value("EF").is_some() {
        found.insert(Finding::FileSpecWithPayload {
            object,
            filename: dict
                .get_text("UF")
                .or_else(|| dict.get_text("F")),
        });
    }
}

fn document_level(ctx: &DocumentContext, catalog: &Dict, found: &mut BTreeSet<Finding>) {
    if let Some(open) = ctx.get(catalog, "OpenAction") {
        let target = match &*open {
            PdfValue::Array(_) => "destination".to_string(),
            other => other
                .dict()
                .and_then(|d| d.get_name("S"))
                .map_or_else(|| "unknown".to_string(), |s| format!("action /{s}")),
        };
        found.insert(Finding::OpenAction { target });
    }

    if let Some(names) = ctx.get(catalog, "Names")
        && let Some(names) = names.as_dict()
    {
        if let Some(js) = names.get("JavaScript") {
            for (name, _) in ctx.name_tree(js) {
                found.insert(Finding::NamedJavaScript { name });
            }
        }
        if let Some(files) = names.get("EmbeddedFiles") {
            for (name, _) in ctx.name_tree(files) {
                found.insert(Finding::EmbeddedFile { name });
            }
        }
    }

    if let Some(form) = ctx.get(catalog, "AcroForm")
        && let Some(form) = form.as_dict()
        && let Some(xfa) = form.value("XFA")
    {
        found.insert(Finding::XfaForm {
            object: xfa.as_reference(),
        });
    }
}

/// First characters of a script, whitespace collapsed.
fn preview(script: &[u8]) -> String {
    String::from_utf8_lossy(script)
        .split_whitespace()
        .join(" ")
        .chars()
        .take(PREVIEW_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_collapses_whitespace() {
        assert_eq!(preview(b"app.alert(1);\n\n  this.x()"), "app.alert(1); this.x()");
        assert_eq!(preview(&[b'a'; 200]).len(), PREVIEW_CHARS);
    }

    #[test]
    fn test_kind_matches_serde_tag() {
        let finding = Finding::Rendition { object: None };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], finding.kind());
    }
}
