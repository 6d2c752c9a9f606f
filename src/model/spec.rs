//! Field and model descriptors plus the two row codecs.

use std::ops::Range;

use eyre::{bail, ensure, Result, WrapErr};
use zerocopy::little_endian::I64;
use zerocopy::{FromBytes, IntoBytes};

use super::{FieldValue, FILL_BYTE, INT_PACKED_WIDTH, INT_TEXT_WIDTH};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Text,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    width: usize,
    kind: FieldKind,
}

impl FieldSpec {
    pub fn text(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
            kind: FieldKind::Text,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::int_with_width(name, INT_TEXT_WIDTH)
    }

    /// Integer field with a custom decimal width in the text layout. The
    /// packed layout always uses [`INT_PACKED_WIDTH`] bytes regardless.
    pub fn int_with_width(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
            kind: FieldKind::Int,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn text_width(&self) -> usize {
        self.width
    }

    pub fn packed_width(&self) -> usize {
        match self.kind {
            FieldKind::Int => INT_PACKED_WIDTH,
            FieldKind::Text => self.width,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    name: String,
    fields: Vec<FieldSpec>,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self> {
        let name = name.into();

        ensure!(!name.is_empty(), "model name must not be empty");
        ensure!(
            !fields.is_empty(),
            "model '{}' must declare at least one field",
            name
        );

        for (i, field) in fields.iter().enumerate() {
            ensure!(
                field.width > 0,
                "field '{}' of model '{}' has zero width",
                field.name,
                name
            );
            ensure!(
                !fields[..i].iter().any(|f| f.name == field.name),
                "model '{}' declares field '{}' twice",
                name,
                field.name
            );
        }

        Ok(Self { name, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn text_row_width(&self) -> usize {
        self.fields.iter().map(|f| f.text_width()).sum()
    }

    pub fn packed_row_width(&self) -> usize {
        self.fields.iter().map(|f| f.packed_width()).sum()
    }

    /// Byte range of `field` within a text-layout row.
    pub fn text_field_range(&self, field: &str) -> Option<Range<usize>> {
        self.field_range(field, FieldSpec::text_width)
    }

    /// Byte range of `field` within a packed-layout row (flag byte excluded).
    pub fn packed_field_range(&self, field: &str) -> Option<Range<usize>> {
        self.field_range(field, FieldSpec::packed_width)
    }

    fn field_range(&self, field: &str, width: impl Fn(&FieldSpec) -> usize) -> Option<Range<usize>> {
        let mut offset = 0;
        for f in &self.fields {
            let w = width(f);
            if f.name == field {
                return Some(offset..offset + w);
            }
            offset += w;
        }
        None
    }

    /// Encodes one value per field into a text-layout row.
    pub fn encode_text_row(&self, values: &[FieldValue]) -> Result<Vec<u8>> {
        self.check_arity(values)?;

        let mut row = Vec::with_capacity(self.text_row_width());
        for (field, value) in self.fields.iter().zip(values) {
            let bytes = match (field.kind, value) {
                (FieldKind::Int, FieldValue::Int(n)) => n.to_string().into_bytes(),
                (FieldKind::Text, FieldValue::Text(s)) => s.clone().into_bytes(),
                _ => bail!(
                    "field '{}' of model '{}' expects a {:?} value",
                    field.name,
                    self.name,
                    field.kind
                ),
            };
            push_padded(&mut row, &bytes, field.text_width())?;
        }
        Ok(row)
    }

    /// Decodes a text-layout row back into one value per field.
    pub fn decode_text_row(&self, row: &[u8]) -> Result<Vec<FieldValue>> {
        ensure!(
            row.len() == self.text_row_width(),
            "row is {} bytes, model '{}' expects {}",
            row.len(),
            self.name,
            self.text_row_width()
        );

        let mut values = Vec::with_capacity(self.fields.len());
        let mut offset = 0;
        for field in &self.fields {
            let raw = trim_fill(&row[offset..offset + field.text_width()]);
            values.push(match field.kind {
                FieldKind::Int => {
                    let text = std::str::from_utf8(raw)
                        .wrap_err_with(|| format!("field '{}' is not valid utf-8", field.name))?;
                    FieldValue::Int(text.parse().wrap_err_with(|| {
                        format!("field '{}' holds non-numeric text '{}'", field.name, text)
                    })?)
                }
                FieldKind::Text => FieldValue::Text(
                    std::str::from_utf8(raw)
                        .wrap_err_with(|| format!("field '{}' is not valid utf-8", field.name))?
                        .to_string(),
                ),
            });
            offset += field.text_width();
        }
        Ok(values)
    }

    /// Encodes one value per field into a packed-layout row (flag byte
    /// excluded; the store prepends it).
    pub fn encode_packed_row(&self, values: &[FieldValue]) -> Result<Vec<u8>> {
        self.check_arity(values)?;

        let mut row = Vec::with_capacity(self.packed_row_width());
        for (field, value) in self.fields.iter().zip(values) {
            match (field.kind, value) {
                (FieldKind::Int, FieldValue::Int(n)) => {
                    row.extend_from_slice(I64::new(*n).as_bytes());
                }
                (FieldKind::Text, FieldValue::Text(s)) => {
                    push_padded(&mut row, s.as_bytes(), field.text_width())?;
                }
                _ => bail!(
                    "field '{}' of model '{}' expects a {:?} value",
                    field.name,
                    self.name,
                    field.kind
                ),
            }
        }
        Ok(row)
    }

    /// Decodes a packed-layout row back into one value per field.
    pub fn decode_packed_row(&self, row: &[u8]) -> Result<Vec<FieldValue>> {
        ensure!(
            row.len() == self.packed_row_width(),
            "row is {} bytes, model '{}' expects {}",
            row.len(),
            self.name,
            self.packed_row_width()
        );

        let mut values = Vec::with_capacity(self.fields.len());
        let mut offset = 0;
        for field in &self.fields {
            let w = field.packed_width();
            let raw = &row[offset..offset + w];
            values.push(match field.kind {
                FieldKind::Int => {
                    let n = I64::read_from_bytes(raw)
                        .map_err(|e| eyre::eyre!("field '{}' is malformed: {:?}", field.name, e))?;
                    FieldValue::Int(n.get())
                }
                FieldKind::Text => FieldValue::Text(
                    std::str::from_utf8(trim_fill(raw))
                        .wrap_err_with(|| format!("field '{}' is not valid utf-8", field.name))?
                        .to_string(),
                ),
            });
            offset += w;
        }
        Ok(values)
    }

    fn check_arity(&self, values: &[FieldValue]) -> Result<()> {
        ensure!(
            values.len() == self.fields.len(),
            "model '{}' has {} fields but {} values were given",
            self.name,
            self.fields.len(),
            values.len()
        );
        Ok(())
    }
}

fn push_padded(row: &mut Vec<u8>, bytes: &[u8], width: usize) -> Result<()> {
    if bytes.len() > width {
        bail!(StoreError::Integrity {
            len: bytes.len(),
            row_width: width,
        });
    }
    row.extend_from_slice(bytes);
    row.resize(row.len() + width - bytes.len(), FILL_BYTE);
    Ok(())
}

/// Strips trailing fill bytes from a field slice.
pub(crate) fn trim_fill(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|&b| b != FILL_BYTE)
        .map_or(0, |i| i + 1);
    &raw[..end]
}
