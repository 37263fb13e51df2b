//! The structured analysis tree.
//!
//! ```text
//! <identify-result worker=".." version=".." start="..">
//!   <datei-liste>
//!     <datei filename=".." status=".." errors="0">
//!       <stats/> <file/> <simplemagic/> <droid/> <jhove/> <tika/>
//!       <mediainfo/> <x-pictool-metaex/> <libDimagIdentify/>
//!     </datei>
//!   </datei-liste>
//! </identify-result>
//! ```
//!
//! Every tool section is optional and so is every value inside it. Only the
//! document itself and its `datei-liste` are required.

use serde::Serialize;

use super::xml::{self, Element};
use crate::errors::DecodeError;

pub const FILE_LIST: &str = "datei-liste";
pub const FILE_ENTRY: &str = "datei";

/// Lenient integer read: surrounding whitespace is ignored, `NaN` counts as
/// missing and decorated values like `"1024 bytes"` yield their leading digits,
/// keeping a minus sign that sits right before them.
pub fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "NaN" {
        return None;
    }
    if let Ok(value) = raw.parse() {
        return Some(value);
    }
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let end = raw[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(raw.len(), |len| start + len);
    // A minus sign directly before the digits belongs to the number.
    let start = if raw[..start].ends_with('-') {
        start - 1
    } else {
        start
    };
    raw[start..end].parse().ok()
}

fn text(el: Option<&Element>) -> Option<String> {
    let text = el?.text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn int(el: Option<&Element>) -> Option<i64> {
    parse_int(&el?.text)
}

fn attr(el: &Element, name: &str) -> Option<String> {
    el.attr(name).map(str::to_string)
}

/// A record read out of one element; a missing element yields the empty
/// record.
trait FromElement: Default {
    fn read(el: &Element) -> Self;

    fn from_element(el: Option<&Element>) -> Self {
        el.map(Self::read).unwrap_or_default()
    }
}

/// Character frequency counters gathered while scanning the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ByteCount {
    pub lf: Option<i64>,
    pub cr: Option<i64>,
    pub tab: Option<i64>,
    pub csv_semicolon_first_line: Option<i64>,
    pub csv_lf: Option<i64>,
    pub semicolon: Option<i64>,
    pub pipe: Option<i64>,
    pub comma: Option<i64>,
    pub colon: Option<i64>,
    pub minus: Option<i64>,
    pub equal: Option<i64>,
    pub single_quote: Option<i64>,
    pub double_quote: Option<i64>,
    pub null: Option<i64>,
    pub blank: Option<i64>,
    pub upper_d: Option<i64>,
    pub upper_o: Option<i64>,
    pub upper_t: Option<i64>,
    pub lower_d: Option<i64>,
    pub lower_o: Option<i64>,
    pub lower_t: Option<i64>,
    /// Character set label (`zeichenformat`).
    pub char_format: Option<String>,
}

impl FromElement for ByteCount {
    fn read(el: &Element) -> Self {
        let n = |name| int(el.child(name));
        ByteCount {
            lf: n("lf"),
            cr: n("cr"),
            tab: n("tab"),
            csv_semicolon_first_line: n("csvSemicolonFirstLine"),
            csv_lf: n("csvLF"),
            semicolon: n("semicolon"),
            pipe: n("pipe"),
            comma: n("comma"),
            colon: n("colon"),
            minus: n("minus"),
            equal: n("equal"),
            single_quote: n("singleQuote"),
            double_quote: n("doubleQuote"),
            null: n("null"),
            blank: n("blank"),
            upper_d: n("upperC_D"),
            upper_o: n("upperC_O"),
            upper_t: n("upperC_T"),
            lower_d: n("lowerC_d"),
            lower_o: n("lowerC_o"),
            lower_t: n("lowerC_t"),
            char_format: text(el.child("zeichenformat")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub status: Option<String>,
    pub md5: Option<String>,
    pub filesize: Option<i64>,
    pub filename: Option<String>,
    pub lastmod: Option<i64>,
    pub created: Option<i64>,
    pub byte_count: ByteCount,
}

impl FromElement for Stats {
    fn read(el: &Element) -> Self {
        Stats {
            status: attr(el, "status"),
            md5: text(el.child("md5")),
            filesize: int(el.child("filesize")),
            filename: text(el.child("filename")),
            lastmod: int(el.child("lastmod")),
            created: int(el.child("created")),
            byte_count: ByteCount::from_element(el.child("byte-count")),
        }
    }
}

/// Output of the `file` utility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub status: Option<String>,
    pub version: Option<String>,
    pub filename: Option<String>,
    pub file_version: Option<String>,
    pub file_type: Option<String>,
    pub mime_type: Option<String>,
    pub mime_encoding: Option<String>,
}

impl FromElement for FileInfo {
    fn read(el: &Element) -> Self {
        FileInfo {
            status: attr(el, "status"),
            version: attr(el, "version"),
            filename: text(el.child("file-filename")),
            file_version: text(el.child("file-version")),
            file_type: text(el.child("file-type")),
            mime_type: text(el.child("file-mime-type")),
            mime_encoding: text(el.child("file-mime-encoding")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimpleMagic {
    pub status: Option<String>,
    pub version: Option<String>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub message: Option<String>,
    pub simple_name: Option<String>,
}

impl FromElement for SimpleMagic {
    fn read(el: &Element) -> Self {
        SimpleMagic {
            status: attr(el, "status"),
            version: attr(el, "version"),
            filename: text(el.child("simplemagic-filename")),
            mime_type: text(el.child("simplemagic-mime-type")),
            message: text(el.child("simplemagic-message")),
            simple_name: text(el.child("simplemagic-simplename")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DroidResult {
    pub mime_type: Option<String>,
    pub type_name: Option<String>,
    pub puid: Option<String>,
    pub x_version: Option<String>,
    pub method: Option<String>,
}

impl FromElement for DroidResult {
    fn read(el: &Element) -> Self {
        DroidResult {
            mime_type: text(el.child("droid-mimetype")),
            type_name: text(el.child("droid-typename")),
            puid: text(el.child("droid-puid")),
            x_version: text(el.child("droid-x-version")),
            method: text(el.child("droid-method")),
        }
    }
}

/// PRONOM format identification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Droid {
    pub container_sig_version: Option<String>,
    pub sig_date: Option<String>,
    pub sig_version: Option<String>,
    pub status: Option<String>,
    pub version: Option<String>,
    pub result: DroidResult,
}

impl FromElement for Droid {
    fn read(el: &Element) -> Self {
        Droid {
            container_sig_version: attr(el, "container-sigversion"),
            sig_date: attr(el, "sigdate"),
            sig_version: attr(el, "sigversion"),
            status: attr(el, "status"),
            version: attr(el, "version"),
            result: DroidResult::from_element(el.child("droid-result")),
        }
    }
}

/// Format validation and the technical properties JHOVE reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Jhove {
    pub build_date: Option<String>,
    pub status: Option<String>,
    pub format: Option<String>,
    pub version: Option<String>,
    pub well_formed: Option<String>,
    pub valid: Option<String>,
    pub mime: Option<String>,
    pub compression: Option<String>,
    pub audio_channels: Option<String>,
    pub audio_codec: Option<String>,
    pub audio_duration: Option<String>,
    pub audio_sample_rate: Option<String>,
    pub audio_bit_depth: Option<String>,
    pub audio_name: Option<String>,
    pub audio_comment: Option<String>,
    pub audio_creation_date: Option<String>,
    pub image_length: Option<String>,
    pub image_width: Option<String>,
    pub color: Option<String>,
    pub bits_per_sample: Option<String>,
    pub pdf_profile: Option<String>,
    pub page_count: Option<String>,
    pub image_count: Option<String>,
    pub char_count: Option<String>,
    pub line_endings: Option<String>,
}

impl FromElement for Jhove {
    fn read(el: &Element) -> Self {
        let g = |name| text(el.child(name));
        Jhove {
            build_date: attr(el, "builddate"),
            status: attr(el, "status"),
            format: g("jhove-format"),
            version: g("jhove-version"),
            well_formed: g("jhove-wellformed"),
            valid: g("jhove-valid"),
            mime: g("jhove-mime"),
            compression: g("jhove-compression"),
            audio_channels: g("jhove-audio-numchannels"),
            audio_codec: g("jhove-audio-codec"),
            audio_duration: g("jhove-audio-abspieldauer"),
            audio_sample_rate: g("jhove-audio-abtastrate"),
            audio_bit_depth: g("jhove-audio-bittiefe"),
            audio_name: g("jhove-audio_name"),
            audio_comment: g("jhove-audio_comment"),
            audio_creation_date: g("jhove-audio_creationdate"),
            image_length: g("jhove-image-length"),
            image_width: g("jhove-image-width"),
            color: g("jhove-color"),
            bits_per_sample: g("jhove-bitspersample"),
            pdf_profile: g("jhove-pdf-profile"),
            page_count: g("jhove-cnt-pages"),
            image_count: g("jhove-cnt-images"),
            char_count: g("jhove-cnt-chars"),
            line_endings: g("jhove-line-endings"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tika {
    pub status: Option<String>,
    pub version: Option<String>,
    pub mime_type: Option<String>,
}

impl FromElement for Tika {
    fn read(el: &Element) -> Self {
        Tika {
            status: attr(el, "status"),
            version: attr(el, "version"),
            mime_type: text(el.child("tika-type")),
        }
    }
}

/// Audio/video stream properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaInfo {
    pub status: Option<String>,
    pub version: Option<String>,
    pub tool_version: Option<String>,
    pub audio_bit_depth: Option<String>,
    pub audio_bit_rate: Option<String>,
    pub audio_channels: Option<String>,
    pub audio_duration: Option<String>,
    pub audio_codec: Option<String>,
    pub audio_sampling_rate: Option<String>,
    pub general_album: Option<String>,
    pub general_performer: Option<String>,
    pub general_track_name: Option<String>,
    pub general_duration: Option<String>,
    pub general_format: Option<String>,
    pub general_overall_bit_rate: Option<String>,
    pub video_bit_rate: Option<String>,
    pub video_color_space: Option<String>,
    pub video_display_aspect_ratio: Option<String>,
    pub video_duration: Option<String>,
    pub video_codec: Option<String>,
    pub video_frame_rate: Option<String>,
    pub video_height: Option<String>,
    pub video_width: Option<String>,
}

impl FromElement for MediaInfo {
    fn read(el: &Element) -> Self {
        let g = |name| text(el.child(name));
        MediaInfo {
            status: attr(el, "status"),
            version: attr(el, "version"),
            tool_version: g("Mediainfo-tool-version"),
            audio_bit_depth: g("Audio-bit-depth"),
            audio_bit_rate: g("Audio-bit-rate"),
            audio_channels: g("Audio-channels"),
            audio_duration: g("Audio-duration"),
            audio_codec: g("Audio-codec"),
            audio_sampling_rate: g("Audio-sampling-rate"),
            general_album: g("General-album"),
            general_performer: g("General-performer"),
            general_track_name: g("General-track-name"),
            general_duration: g("General-duration"),
            general_format: g("General-format"),
            general_overall_bit_rate: g("General-overall-bit-rate"),
            video_bit_rate: g("Video-bit-rate"),
            video_color_space: g("Video-color-space"),
            video_display_aspect_ratio: g("Video-display-aspect-ratio"),
            video_duration: g("Video-duration"),
            video_codec: g("Video-codec"),
            video_frame_rate: g("Video-frame-rate"),
            video_height: g("Video-height"),
            video_width: g("Video-width"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedTag {
    pub name: Option<String>,
    pub value: Option<String>,
}

impl FromElement for ExtractedTag {
    fn read(el: &Element) -> Self {
        ExtractedTag {
            name: text(el.child("name")),
            value: text(el.child("value")),
        }
    }
}

/// Embedded metadata tags (`x-pictool-metaex`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metaex {
    pub status: Option<String>,
    pub version: Option<String>,
    pub tags: Vec<ExtractedTag>,
}

impl Metaex {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name.as_deref() == Some(name))
            .and_then(|tag| tag.value.as_deref())
    }
}

impl FromElement for Metaex {
    fn read(el: &Element) -> Self {
        Metaex {
            status: attr(el, "status"),
            version: attr(el, "version"),
            tags: el.children_named("extracted-tag").map(ExtractedTag::read).collect(),
        }
    }
}

/// The archive's own best guess (`libDimagIdentify`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DimagGuess {
    pub mime_type: Option<String>,
    pub puid: Option<String>,
    pub title: Option<String>,
}

impl FromElement for DimagGuess {
    fn read(el: &Element) -> Self {
        DimagGuess {
            mime_type: text(el.child("guessed-mime-type")),
            puid: text(el.child("guessed-puid")),
            title: text(el.child("guessed-title")),
        }
    }
}

/// Everything the tools found out about one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub errors: Option<i64>,
    pub filename: Option<String>,
    pub status: Option<String>,
    pub stats: Stats,
    pub file: FileInfo,
    pub simplemagic: SimpleMagic,
    pub droid: Droid,
    pub jhove: Jhove,
    pub tika: Tika,
    pub mediainfo: MediaInfo,
    pub metaex: Metaex,
    pub dimag_guess: DimagGuess,
}

impl FromElement for FileRecord {
    fn read(el: &Element) -> Self {
        FileRecord {
            errors: el.attr("errors").and_then(parse_int),
            filename: attr(el, "filename"),
            status: attr(el, "status"),
            stats: Stats::from_element(el.child("stats")),
            file: FileInfo::from_element(el.child("file")),
            simplemagic: SimpleMagic::from_element(el.child("simplemagic")),
            droid: Droid::from_element(el.child("droid")),
            jhove: Jhove::from_element(el.child("jhove")),
            tika: Tika::from_element(el.child("tika")),
            mediainfo: MediaInfo::from_element(el.child("mediainfo")),
            metaex: Metaex::from_element(el.child("x-pictool-metaex")),
            dimag_guess: DimagGuess::from_element(el.child("libDimagIdentify")),
        }
    }
}

/// One result batch as produced by an identification worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentifyResult {
    pub worker: Option<String>,
    pub version: Option<String>,
    pub start: Option<String>,
    pub files: Vec<FileRecord>,
}

impl IdentifyResult {
    pub fn from_root(root: &Element) -> Result<IdentifyResult, DecodeError> {
        let list = root
            .child(FILE_LIST)
            .ok_or(DecodeError::MissingElement(FILE_LIST))?;
        Ok(IdentifyResult {
            worker: attr(root, "worker"),
            version: attr(root, "version"),
            start: attr(root, "start"),
            files: list.children_named(FILE_ENTRY).map(FileRecord::read).collect(),
        })
    }
}

pub fn parse(document: &str) -> Result<IdentifyResult, DecodeError> {
    if document.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    IdentifyResult::from_root(&xml::parse(document)?)
}
