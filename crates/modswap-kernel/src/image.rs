//! WebAssembly module image codec
//!
//! Parses a binary module into its sections far enough to read and rewrite
//! the self-declared module name (subsection 0 of the `name` custom section)
//! and to read/write custom sections, then re-serialises the whole module.
//! Non-custom sections are carried through byte for byte.

use thiserror::Error;

/// `\0asm`
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
/// Binary format version 1
pub const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
/// Custom section holding debug names, including the module name
pub const NAME_SECTION: &str = "name";
/// Custom section holding the mod manifest
pub const MANIFEST_SECTION: &str = "modswap.manifest";

const CUSTOM_SECTION_ID: u8 = 0;
const MODULE_NAME_SUBSECTION: u8 = 0;

/// Module image errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ImageError {
    #[error("Module image too short ({0} bytes)")]
    TooShort(usize),

    #[error("Not a WebAssembly module: bad magic number")]
    BadMagic,

    #[error("Unsupported module version: {0:?}")]
    UnsupportedVersion([u8; 4]),

    #[error("Unexpected end of module at offset {0}")]
    Truncated(usize),

    #[error("Malformed LEB128 integer at offset {0}")]
    MalformedLeb(usize),

    #[error("Invalid UTF-8 name at offset {0}")]
    InvalidUtf8(usize),

    #[error("Section {id} at offset {offset} overruns the module")]
    SectionOverrun { id: u8, offset: usize },

    #[error("Malformed name section: {0}")]
    MalformedNameSection(String),
}

/// One top-level section of a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// Custom section (id 0)
    Custom { name: String, payload: Vec<u8> },
    /// Any other section, kept opaque
    Standard { id: u8, payload: Vec<u8> },
}

/// Parsed module image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImage {
    sections: Vec<Section>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Offset of `bytes[0]` within the whole module, for diagnostics
    base: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], base: usize) -> Self {
        Self { bytes, pos: 0, base }
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn read_u8(&mut self) -> Result<u8, ImageError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(ImageError::Truncated(self.offset()))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u32(&mut self) -> Result<u32, ImageError> {
        let start = self.offset();
        let mut result: u32 = 0;
        for i in 0..5 {
            let byte = self.read_u8()?;
            if i == 4 && byte & 0xf0 != 0 {
                return Err(ImageError::MalformedLeb(start));
            }
            result |= ((byte & 0x7f) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(ImageError::MalformedLeb(start))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ImageError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ImageError::Truncated(self.offset()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_name(&mut self) -> Result<String, ImageError> {
        let offset = self.offset();
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ImageError::InvalidUtf8(offset))
    }
}

fn write_u32(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    write_u32(out, name.len() as u32);
    out.extend_from_slice(name.as_bytes());
}

impl Section {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Section::Custom { name, payload } => {
                let mut body = Vec::with_capacity(name.len() + payload.len() + 5);
                write_name(&mut body, name);
                body.extend_from_slice(payload);
                out.push(CUSTOM_SECTION_ID);
                write_u32(out, body.len() as u32);
                out.extend_from_slice(&body);
            }
            Section::Standard { id, payload } => {
                out.push(*id);
                write_u32(out, payload.len() as u32);
                out.extend_from_slice(payload);
            }
        }
    }
}

impl ModuleImage {
    /// Parse a binary module
    pub fn parse(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() < 8 {
            return Err(ImageError::TooShort(bytes.len()));
        }
        if bytes[0..4] != WASM_MAGIC {
            return Err(ImageError::BadMagic);
        }
        if bytes[4..8] != WASM_VERSION {
            let mut version = [0u8; 4];
            version.copy_from_slice(&bytes[4..8]);
            return Err(ImageError::UnsupportedVersion(version));
        }

        let mut reader = Reader::new(&bytes[8..], 8);
        let mut sections = Vec::new();

        while !reader.is_empty() {
            let offset = reader.offset();
            let id = reader.read_u8()?;
            let size = reader.read_u32()? as usize;
            let body = reader
                .read_bytes(size)
                .map_err(|_| ImageError::SectionOverrun { id, offset })?;

            if id == CUSTOM_SECTION_ID {
                let mut body_reader = Reader::new(body, reader.offset() - size);
                let name = body_reader.read_name()?;
                let payload = body[body_reader.pos..].to_vec();
                sections.push(Section::Custom { name, payload });
            } else {
                sections.push(Section::Standard {
                    id,
                    payload: body.to_vec(),
                });
            }
        }

        Ok(Self { sections })
    }

    /// Serialise the full module
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&WASM_MAGIC);
        out.extend_from_slice(&WASM_VERSION);
        for section in &self.sections {
            section.encode(&mut out);
        }
        out
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Payload of the first custom section with this name
    pub fn custom_section(&self, name: &str) -> Option<&[u8]> {
        self.sections.iter().find_map(|s| match s {
            Section::Custom { name: n, payload } if n == name => Some(payload.as_slice()),
            _ => None,
        })
    }

    /// Replace the payload of a custom section, appending the section if absent
    pub fn set_custom_section(&mut self, name: &str, payload: Vec<u8>) {
        let existing = self.sections.iter_mut().find_map(|s| match s {
            Section::Custom { name: n, payload: p } if n == name => Some(p),
            _ => None,
        });
        if let Some(p) = existing {
            *p = payload;
            return;
        }
        self.sections.push(Section::Custom {
            name: name.to_string(),
            payload,
        });
    }

    /// The self-declared module name, if the module carries one
    pub fn module_name(&self) -> Result<Option<String>, ImageError> {
        let Some(payload) = self.custom_section(NAME_SECTION) else {
            return Ok(None);
        };

        for (id, content) in parse_name_subsections(payload)? {
            if id == MODULE_NAME_SUBSECTION {
                let mut reader = Reader::new(&content, 0);
                let name = reader
                    .read_name()
                    .map_err(|e| ImageError::MalformedNameSection(e.to_string()))?;
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// Set the module name, creating the name section or subsection as needed
    pub fn set_module_name(&mut self, name: &str) -> Result<(), ImageError> {
        let mut subsections = match self.custom_section(NAME_SECTION) {
            Some(payload) => parse_name_subsections(payload)?,
            None => Vec::new(),
        };

        let mut content = Vec::with_capacity(name.len() + 5);
        write_name(&mut content, name);

        subsections.retain(|(id, _)| *id != MODULE_NAME_SUBSECTION);
        // The module name subsection must come first.
        subsections.insert(0, (MODULE_NAME_SUBSECTION, content));

        let mut payload = Vec::new();
        for (id, content) in &subsections {
            payload.push(*id);
            write_u32(&mut payload, content.len() as u32);
            payload.extend_from_slice(content);
        }

        self.set_custom_section(NAME_SECTION, payload);
        Ok(())
    }
}

fn parse_name_subsections(payload: &[u8]) -> Result<Vec<(u8, Vec<u8>)>, ImageError> {
    let mut reader = Reader::new(payload, 0);
    let mut subsections = Vec::new();
    while !reader.is_empty() {
        let id = reader
            .read_u8()
            .map_err(|e| ImageError::MalformedNameSection(e.to_string()))?;
        let size = reader
            .read_u32()
            .map_err(|e| ImageError::MalformedNameSection(e.to_string()))? as usize;
        let content = reader
            .read_bytes(size)
            .map_err(|e| ImageError::MalformedNameSection(e.to_string()))?;
        subsections.push((id, content.to_vec()));
    }
    Ok(subsections)
}
