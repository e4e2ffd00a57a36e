//! Tool registry — the four data tools offered to the model.
//!
//! Each tool maps one-to-one onto an `EndpointKey`; the executor uses this
//! registry to look tools up by the name the model requested.

use std::collections::HashMap;

use ems_llm::ToolDeclaration;
use ems_protocol::EndpointKey;
use serde_json::json;

/// Metadata about a registered tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub endpoint: EndpointKey,
    pub schema: serde_json::Value,
}

/// Name-indexed set of data tools.
pub struct ToolRegistry {
    tools: Vec<ToolInfo>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<ToolInfo>) -> Self {
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Self { tools, index }
    }

    /// One tool per endpoint, in catalog order.
    pub fn with_defaults() -> Self {
        Self::new(
            EndpointKey::ALL
                .into_iter()
                .map(|endpoint| ToolInfo {
                    name: endpoint.tool_name().to_string(),
                    description: description(endpoint).to_string(),
                    endpoint,
                    schema: date_range_schema(),
                })
                .collect(),
        )
    }

    /// Endpoint behind a tool name, if registered.
    pub fn lookup(&self, name: &str) -> Option<EndpointKey> {
        self.index.get(name).map(|&i| self.tools[i].endpoint)
    }

    /// Declarations in the shape the chat API expects.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools
            .iter()
            .map(|t| ToolDeclaration::function(&t.name, &t.description, t.schema.clone()))
            .collect()
    }

    pub fn list_tools(&self) -> &[ToolInfo] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Parameters shared by every tool: a required ISO date range.
fn date_range_schema() -> serde_json::Value {
    let date = json!({
        "type": "string",
        "description": "Fecha en formato 'YYYY-MM-DD'"
    });
    json!({
        "type": "object",
        "properties": {
            "dateStart": date,
            "dateEnd": date
        },
        "required": ["dateStart", "dateEnd"],
        "additionalProperties": false
    })
}

fn description(endpoint: EndpointKey) -> &'static str {
    match endpoint {
        EndpointKey::Summary => {
            "Devuelve un JSON con el resumen general por orden de producción en el rango de fechas: \
             ID de orden, máquina (cceId), tiempos totales y productivos (pdnTotalTime, pdnEffectiveTime), \
             tiempos y porcentaje de parada (totalStopTime, stopTimePercentage), consumo bruto, producción \
             total, conforme y rechazos (totalProduction, noComplaintProduction), productividades \
             (realProductivity, effectiveProductivity), demanda estable, indicadores SEC (secN, secG, secS, secB) \
             y las brechas de cada orden."
        }
        EndpointKey::Moldes => {
            "Devuelve un JSON con el desempeño energético y productivo por molde. Úsala para analizar un molde \
             o comparar moldes: consumo (kWh), producción conforme (kg), productividad efectiva (kg/h), demanda \
             estable (kW), indicadores SEC (SECn, SECg, SECs, SECb), brechas (producción, calidad, proceso + \
             tecnología), nivel de desempeño, nivel de eficiencia y área del molde."
        }
        EndpointKey::Referencias => {
            "Devuelve un JSON con el desempeño energético y productivo por referencia o producto (SKU): consumo \
             (kWh), producción conforme (kg), productividad efectiva (kg/h), demanda estable (kW), indicadores SEC \
             (SECn, SECg, SECs, SECb), brechas (producción, calidad, proceso + tecnología), desempeño general y \
             nivel de eficiencia por área."
        }
        EndpointKey::LineaBase => {
            "Devuelve el modelo de línea base (pendiente e intercepto), el consumo actual y un análisis CUSUM \
             semanal de energía (kWh) y costos. Úsala para ahorros, sobrecostos, energía esperada vs consumida, \
             tendencias CUSUM o parámetros del modelo."
        }
    }
}
