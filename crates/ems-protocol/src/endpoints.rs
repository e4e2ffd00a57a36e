use serde::{Deserialize, Serialize};

/// One of the four fixed data sources exposed by the energy API.
///
/// The serialized form doubles as the classification label used by the
/// router prompt, so it must stay in sync with `ROUTER_PROMPT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKey {
    /// Per-production-order summary for the plant.
    Summary,
    /// Indicators broken down by mold.
    Moldes,
    /// Indicators broken down by product reference (SKU).
    Referencias,
    /// Baseline model and weekly CUSUM analysis.
    LineaBase,
}

impl EndpointKey {
    /// All endpoints, in catalog order.
    pub const ALL: [EndpointKey; 4] = [
        EndpointKey::Summary,
        EndpointKey::Moldes,
        EndpointKey::Referencias,
        EndpointKey::LineaBase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Moldes => "moldes",
            Self::Referencias => "referencias",
            Self::LineaBase => "linea_base",
        }
    }

    /// Exact match on the lowercase label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == label)
    }

    /// Function name offered to the model for this endpoint.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Summary => "obtener_resumen_general",
            Self::Moldes => "obtener_datos_moldes",
            Self::Referencias => "obtener_datos_referencias",
            Self::LineaBase => "obtener_linea_base",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tool_name() == name)
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Summary => "Resumen general",
            Self::Moldes => "Moldes",
            Self::Referencias => "Referencias",
            Self::LineaBase => "Línea base",
        }
    }
}

impl std::fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved endpoint: key, absolute URL and display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub key: EndpointKey,
    pub url: String,
    pub label: String,
}

impl EndpointDescriptor {
    pub fn new(key: EndpointKey, url: impl Into<String>) -> Self {
        Self {
            key,
            url: url.into(),
            label: key.label().to_string(),
        }
    }
}

/// Immutable set of exactly four endpoint descriptors.
#[derive(Debug, Clone)]
pub struct EndpointCatalog {
    descriptors: [EndpointDescriptor; 4],
}

impl EndpointCatalog {
    /// Build the catalog from one URL per endpoint.
    pub fn new(summary: &str, moldes: &str, referencias: &str, linea_base: &str) -> Self {
        Self {
            descriptors: [
                EndpointDescriptor::new(EndpointKey::Summary, summary),
                EndpointDescriptor::new(EndpointKey::Moldes, moldes),
                EndpointDescriptor::new(EndpointKey::Referencias, referencias),
                EndpointDescriptor::new(EndpointKey::LineaBase, linea_base),
            ],
        }
    }

    pub fn get(&self, key: EndpointKey) -> &EndpointDescriptor {
        // Descriptors are stored in `EndpointKey::ALL` order.
        &self.descriptors[key as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.descriptors.iter()
    }
}
