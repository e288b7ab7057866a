use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a [`Record`] within a store.
///
/// Serialized transparently as a JSON number so seed assets can use plain
/// integer ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        RecordId(id)
    }
}

/// One character record in the catalog.
///
/// Field names are serialized in camelCase and optional fields are omitted
/// when `None`, which keeps stored snapshots identical in shape to the seed
/// asset. `id`, `createdAt` and `updatedAt` are owned by the
/// [`Store`](crate::Store): callers never set them directly.
///
/// # Examples
///
/// ```
/// use paddock::{Record, RecordId};
///
/// let json = r##"{"id":3,"name":"Sally Carrera","type":"Porsche 911",
///     "color":"#4169E1","description":"Runs the Cozy Cone Motel."}"##;
/// let record: Record = serde_json::from_str(json).unwrap();
/// assert_eq!(record.id, RecordId(3));
/// assert_eq!(record.kind, "Porsche 911");
/// assert!(!record.is_favorite);
/// assert_eq!(record.hometown, None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub name: String,

    /// Vehicle type, serialized as `"type"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// `#RRGGBB` color string.
    pub color: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hometown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    #[serde(default)]
    pub is_favorite: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Value of a string-typed field, if set.
    pub fn field(&self, field: RecordField) -> Option<&str> {
        match field {
            RecordField::Name => Some(&self.name),
            RecordField::Type => Some(&self.kind),
            RecordField::Color => Some(&self.color),
            RecordField::Description => Some(&self.description),
            RecordField::Hometown => self.hometown.as_deref(),
            RecordField::Specialty => self.specialty.as_deref(),
            RecordField::ImageUrl => self.image_url.as_deref(),
        }
    }

    /// Overlay `patch` onto this record. Fields the patch leaves unset are
    /// retained; identity and timestamps are never touched here.
    pub(crate) fn apply(&mut self, patch: RecordPatch) {
        let RecordPatch {
            name,
            kind,
            color,
            description,
            hometown,
            specialty,
            image_url,
            year,
            is_favorite,
        } = patch;

        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = kind {
            self.kind = v;
        }
        if let Some(v) = color {
            self.color = v;
        }
        if let Some(v) = description {
            self.description = v;
        }
        if let Some(v) = hometown {
            self.hometown = v;
        }
        if let Some(v) = specialty {
            self.specialty = v;
        }
        if let Some(v) = image_url {
            self.image_url = v;
        }
        if let Some(v) = year {
            self.year = v;
        }
        if let Some(v) = is_favorite {
            self.is_favorite = v;
        }
    }
}

/// The string-typed fields of a [`Record`], used to scope searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Name,
    Type,
    Color,
    Description,
    Hometown,
    Specialty,
    ImageUrl,
}

impl RecordField {
    /// Every string-typed field, in declaration order.
    pub const ALL: [RecordField; 7] = [
        RecordField::Name,
        RecordField::Type,
        RecordField::Color,
        RecordField::Description,
        RecordField::Hometown,
        RecordField::Specialty,
        RecordField::ImageUrl,
    ];

    /// The serialized (camelCase) name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordField::Name => "name",
            RecordField::Type => "type",
            RecordField::Color => "color",
            RecordField::Description => "description",
            RecordField::Hometown => "hometown",
            RecordField::Specialty => "specialty",
            RecordField::ImageUrl => "imageUrl",
        }
    }
}

/// A record as submitted for creation, before the store assigns its id and
/// timestamps.
///
/// # Examples
///
/// ```
/// use paddock::NewRecord;
///
/// let new = NewRecord::new("Luigi", "Fiat 500", "#FFD700", "Runs the tire shop.")
///     .with_hometown("Radiator Springs");
/// assert_eq!(new.hometown.as_deref(), Some("Radiator Springs"));
/// assert!(!new.is_favorite);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hometown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl NewRecord {
    /// Create a new record with the required fields set.
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        color: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        NewRecord {
            name: name.into(),
            kind: kind.into(),
            color: color.into(),
            description: description.into(),
            ..NewRecord::default()
        }
    }

    pub fn with_hometown(mut self, hometown: impl Into<String>) -> Self {
        self.hometown = Some(hometown.into());
        self
    }

    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = Some(specialty.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    pub(crate) fn into_record(self, id: RecordId, now: DateTime<Utc>) -> Record {
        Record {
            id,
            name: self.name,
            kind: self.kind,
            color: self.color,
            description: self.description,
            hometown: self.hometown,
            specialty: self.specialty,
            image_url: self.image_url,
            year: self.year,
            is_favorite: self.is_favorite,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// A shallow patch applied by [`Store::update`](crate::Store::update).
///
/// Every field is optional: set fields overwrite, unset fields are retained.
/// Optional record fields take an inner `Option` so a patch can clear them.
///
/// # Examples
///
/// ```
/// use paddock::RecordPatch;
///
/// let patch = RecordPatch::new()
///     .with_name("Lightning McQueen")
///     .with_hometown(None::<String>);
/// assert_eq!(patch.name.as_deref(), Some("Lightning McQueen"));
/// assert_eq!(patch.hometown, Some(None));
/// assert!(patch.color.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub hometown: Option<Option<String>>,
    pub specialty: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub year: Option<Option<u32>>,
    pub is_favorite: Option<bool>,
}

impl RecordPatch {
    pub fn new() -> Self {
        RecordPatch::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_hometown<S: Into<String>>(mut self, hometown: Option<S>) -> Self {
        self.hometown = Some(hometown.map(Into::into));
        self
    }

    pub fn with_specialty<S: Into<String>>(mut self, specialty: Option<S>) -> Self {
        self.specialty = Some(specialty.map(Into::into));
        self
    }

    pub fn with_image_url<S: Into<String>>(mut self, image_url: Option<S>) -> Self {
        self.image_url = Some(image_url.map(Into::into));
        self
    }

    pub fn with_year(mut self, year: Option<u32>) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = Some(is_favorite);
        self
    }
}
