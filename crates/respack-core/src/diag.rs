//! Diagnostic catalog: numeric error codes grouped by class, lazily
//! formatted causes, and fixed suggestion lists (spec §7).

use std::fmt;
use std::sync::Mutex;

/// Error-code class, matching the numeric ranges of spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagCategory {
    Dependency,
    Config,
    FileResource,
    CommandParse,
    ResourcePack,
    Dump,
}

impl DiagCategory {
    fn base(self) -> u32 {
        match self {
            DiagCategory::Dependency => 11_201_000,
            DiagCategory::Config => 11_203_000,
            DiagCategory::FileResource => 11_204_000,
            DiagCategory::CommandParse => 11_210_000,
            DiagCategory::ResourcePack => 11_211_000,
            DiagCategory::Dump => 11_212_000,
        }
    }

    fn name(self) -> &'static str {
        match self {
            DiagCategory::Dependency => "dependency",
            DiagCategory::Config => "config",
            DiagCategory::FileResource => "file-resource",
            DiagCategory::CommandParse => "command-parse",
            DiagCategory::ResourcePack => "resource-pack",
            DiagCategory::Dump => "dump",
        }
    }
}

/// One catalog entry: a stable code, its category, a printf-style cause
/// template (`%s` placeholders substituted positionally), and a fixed
/// list of suggested solutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    ResourceDuplicate,
    ExclusiveStartId,
    IdExceeded,
    QuantityNoOther,
    InvalidColorValue,
    InvalidSymbol,
    InvalidResourceIndex,
    ReferenceNotResolved,
    MissingBaseLimitKey,
    UnresolvedQualifierToken,
    SchemaViolation,
    TranslateTagMismatch,
    IoFailure,
    TranscodeFailed,
    IconSizeViolation,
    Cancelled,
}

impl DiagKind {
    fn category(self) -> DiagCategory {
        match self {
            DiagKind::ResourceDuplicate => DiagCategory::ResourcePack,
            DiagKind::ExclusiveStartId => DiagCategory::Config,
            DiagKind::IdExceeded => DiagCategory::ResourcePack,
            DiagKind::QuantityNoOther => DiagCategory::FileResource,
            DiagKind::InvalidColorValue => DiagCategory::FileResource,
            DiagKind::InvalidSymbol => DiagCategory::FileResource,
            DiagKind::InvalidResourceIndex => DiagCategory::ResourcePack,
            DiagKind::ReferenceNotResolved => DiagCategory::ResourcePack,
            DiagKind::MissingBaseLimitKey => DiagCategory::FileResource,
            DiagKind::UnresolvedQualifierToken => DiagCategory::FileResource,
            DiagKind::SchemaViolation => DiagCategory::FileResource,
            DiagKind::TranslateTagMismatch => DiagCategory::FileResource,
            DiagKind::IoFailure => DiagCategory::Dependency,
            DiagKind::TranscodeFailed => DiagCategory::Dependency,
            DiagKind::IconSizeViolation => DiagCategory::ResourcePack,
            DiagKind::Cancelled => DiagCategory::Dependency,
        }
    }

    /// Offset within the category's numeric range.
    fn offset(self) -> u32 {
        match self {
            DiagKind::ResourceDuplicate => 1,
            DiagKind::ExclusiveStartId => 2,
            DiagKind::IdExceeded => 3,
            DiagKind::QuantityNoOther => 4,
            DiagKind::InvalidColorValue => 5,
            DiagKind::InvalidSymbol => 6,
            DiagKind::InvalidResourceIndex => 7,
            DiagKind::ReferenceNotResolved => 8,
            DiagKind::MissingBaseLimitKey => 9,
            DiagKind::UnresolvedQualifierToken => 10,
            DiagKind::SchemaViolation => 11,
            DiagKind::TranslateTagMismatch => 12,
            DiagKind::IoFailure => 13,
            DiagKind::TranscodeFailed => 14,
            DiagKind::IconSizeViolation => 15,
            DiagKind::Cancelled => 16,
        }
    }

    /// Stable numeric code, e.g. `11211001` for `RESOURCE_DUPLICATE`.
    pub fn code(self) -> u32 {
        self.category().base() + self.offset()
    }

    /// The short mnemonic used in test assertions and log lines.
    pub fn mnemonic(self) -> &'static str {
        match self {
            DiagKind::ResourceDuplicate => "RESOURCE_DUPLICATE",
            DiagKind::ExclusiveStartId => "EXCLUSIVE_START_ID",
            DiagKind::IdExceeded => "ID_EXCEEDED",
            DiagKind::QuantityNoOther => "QUANTITY_NO_OTHER",
            DiagKind::InvalidColorValue => "INVALID_COLOR_VALUE",
            DiagKind::InvalidSymbol => "INVALID_SYMBOL",
            DiagKind::InvalidResourceIndex => "INVALID_RESOURCE_INDEX",
            DiagKind::ReferenceNotResolved => "REFERENCE_NOT_RESOLVED",
            DiagKind::MissingBaseLimitKey => "MISSING_BASE_LIMIT_KEY",
            DiagKind::UnresolvedQualifierToken => "UNRESOLVED_QUALIFIER_TOKEN",
            DiagKind::SchemaViolation => "SCHEMA_VIOLATION",
            DiagKind::TranslateTagMismatch => "TRANSLATE_TAG_MISMATCH",
            DiagKind::IoFailure => "IO_FAILURE",
            DiagKind::TranscodeFailed => "TRANSCODE_FAILED",
            DiagKind::IconSizeViolation => "ICON_SIZE_VIOLATION",
            DiagKind::Cancelled => "CANCELLED",
        }
    }

    fn cause_template(self) -> &'static str {
        match self {
            DiagKind::ResourceDuplicate => {
                "resource %s:%s is already defined at limit-key %s in %s and again in %s"
            }
            DiagKind::ExclusiveStartId => {
                "--startId and an id_defined.json manifest are mutually exclusive"
            }
            DiagKind::IdExceeded => "id count exceeded: %s > %s",
            DiagKind::QuantityNoOther => "plural %s is missing the required 'other' quantity",
            DiagKind::InvalidColorValue => "color value %s is not a valid #RGB/#RGBA/#RRGGBB/#RRGGBBAA literal",
            DiagKind::InvalidSymbol => "symbol value %s is outside the private-use planes 15/16",
            DiagKind::InvalidResourceIndex => "invalid resource index: %s",
            DiagKind::ReferenceNotResolved => "reference %s could not be resolved in any ID pool",
            DiagKind::MissingBaseLimitKey => "resource %s:%s has no 'base' limit-key variant",
            DiagKind::UnresolvedQualifierToken => "directory segment %s: token %s did not match any qualifier kind",
            DiagKind::SchemaViolation => "%s:%s failed schema validation: %s",
            DiagKind::TranslateTagMismatch => "unmatched or out-of-order translate tag in %s:%s",
            DiagKind::IoFailure => "I/O error on %s: %s",
            DiagKind::TranscodeFailed => "transcode of %s failed: %s",
            DiagKind::IconSizeViolation => "icon %s is %sx%s, exceeds the %s limit of %s for %s/%s",
            DiagKind::Cancelled => "task for %s was cancelled before it touched the filesystem",
        }
    }

    fn suggestions(self) -> &'static [&'static str] {
        match self {
            DiagKind::ResourceDuplicate => &[
                "rename one of the conflicting resources",
                "move one variant under a distinct qualifier directory",
            ],
            DiagKind::ExclusiveStartId => {
                &["remove --startId", "remove the id_defined.json manifest"]
            }
            DiagKind::IdExceeded => &[
                "raise --startId to free more of the app ID range",
                "remove unused fixed-ID entries from id_defined.json",
            ],
            DiagKind::QuantityNoOther => &["add an 'other' entry to the plural's value array"],
            DiagKind::InvalidColorValue => {
                &["use a #RGB, #RGBA, #RRGGBB, or #RRGGBBAA literal", "or reference another color with $color:name"]
            }
            DiagKind::InvalidSymbol => {
                &["use a codepoint in [0xF0000,0xFFFFF] or [0x100000,0x10FFFF]"]
            }
            DiagKind::InvalidResourceIndex => {
                &["verify the index file was produced by a compatible writer version"]
            }
            DiagKind::ReferenceNotResolved => {
                &["check the referenced name and type exist", "for $ohos: references, check the system resource table"]
            }
            DiagKind::MissingBaseLimitKey => {
                &["add a base/element (or base/media, base/profile) variant for this name"]
            }
            DiagKind::UnresolvedQualifierToken => {
                &["check the spelling against the supported qualifier values"]
            }
            DiagKind::SchemaViolation => &["check the value shape against the per-type schema"],
            DiagKind::TranslateTagMismatch => {
                &["ensure {noTranslateStart} and {noTranslateEnd} are paired and in order"]
            }
            DiagKind::IoFailure => &["check file permissions and available disk space"],
            DiagKind::TranscodeFailed => &["fall back to a plain copy or fix the source asset"],
            DiagKind::IconSizeViolation => &["resize the icon to the allowed maximum"],
            DiagKind::Cancelled => &["inspect the diagnostic that triggered cancellation"],
        }
    }
}

/// A fully-formatted diagnostic, ready for display or test assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub cause: String,
    pub position: Option<String>,
}

impl Diagnostic {
    /// Formats a diagnostic, substituting `%s` placeholders in the
    /// catalog's cause template with `args`, in order.
    pub fn new(kind: DiagKind, args: &[&str]) -> Self {
        Self {
            kind,
            cause: format_cause(kind.cause_template(), args),
            position: None,
        }
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }
}

/// Substitutes `%s` placeholders in `template` with `args`, in order.
/// Unused trailing args are ignored; missing args leave the placeholder
/// literally in place (this should not happen for catalog entries
/// constructed with the right arity, but is defensive rather than a
/// panic since diagnostics must never crash the pipeline).
fn format_cause(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut arg_iter = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' && chars.peek() == Some(&'s') {
            chars.next();
            if let Some(arg) = arg_iter.next() {
                out.push_str(arg);
            } else {
                out.push_str("%s");
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Error: {:08} [{}] {}",
            self.code(),
            self.kind.category().name(),
            self.kind.mnemonic()
        )?;
        if let Some(pos) = &self.position {
            writeln!(f, "at {pos}")?;
        }
        writeln!(f, "{}", self.cause)?;
        writeln!(f, "Solutions:")?;
        for suggestion in self.kind.suggestions() {
            writeln!(f, "> {suggestion}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Append-only, mutex-guarded diagnostic sink. Every insertion is a
/// single lock/push so that diagnostics from different worker threads
/// never interleave inside one multi-line block (spec §5, §7).
#[derive(Default)]
pub struct DiagSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diag: Diagnostic) {
        self.entries.lock().unwrap().push(diag);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries.into_inner().unwrap()
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_and_categorized() {
        assert_eq!(DiagKind::ResourceDuplicate.code(), 11_211_001);
        assert_eq!(DiagKind::ExclusiveStartId.code(), 11_203_002);
        assert_eq!(DiagKind::QuantityNoOther.code(), 11_204_004);
    }

    #[test]
    fn format_cause_substitutes_in_order() {
        let diag = Diagnostic::new(
            DiagKind::IdExceeded,
            &["0x07000000", "0x06ffffff"],
        );
        assert_eq!(diag.cause, "id count exceeded: 0x07000000 > 0x06ffffff");
    }

    #[test]
    fn sink_does_not_lose_concurrent_pushes() {
        use std::sync::Arc;
        use std::thread;

        let sink = Arc::new(DiagSink::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let sink = Arc::clone(&sink);
            handles.push(thread::spawn(move || {
                sink.push(Diagnostic::new(DiagKind::IoFailure, &["f", &i.to_string()]));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.len(), 8);
    }
}
