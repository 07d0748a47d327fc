//! Fixed column schemas for each destination table.
//!
//! Schemas are declared in code as a typed, enum-keyed structure rather than
//! loaded from configuration: the category set is closed and the warehouse
//! tables are fixed, so an unknown category cannot silently be skipped.

use std::sync::LazyLock;

use crate::classify::Category;

/// Semantic column types supported by the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    Integer,
    Float,
    String,
    Date,
    Timestamp,
}

/// A single typed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub field_type: SemanticType,
}

impl Field {
    const fn new(name: &'static str, field_type: SemanticType) -> Self {
        Self { name, field_type }
    }
}

/// An ordered list of typed columns for one destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub fields: Vec<Field>,
}

impl TableSchema {
    fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}

use SemanticType::{Date, Float, Integer, String, Timestamp};

static SALES_SCHEMA: LazyLock<TableSchema> = LazyLock::new(|| {
    TableSchema::new(vec![
        Field::new("codigo_sucursal", Integer),
        Field::new("codigo_cliente", Integer),
        Field::new("fecha_cierre_comercial", Date),
        Field::new("SKU_codigo", String),
        Field::new("venta_unidades", Integer),
        Field::new("venta_importe", Float),
        Field::new("condicion_venta", String),
    ])
});

static STOCK_SCHEMA: LazyLock<TableSchema> = LazyLock::new(|| {
    TableSchema::new(vec![
        Field::new("codigo_sucursal", Integer),
        Field::new("fecha_cierre_comercial", Date),
        Field::new("SKU_codigo", String),
        Field::new("SKU_descripcion", String),
        Field::new("Stock_unidades", Integer),
        Field::new("unidad", String),
    ])
});

static CUSTOMER_SCHEMA: LazyLock<TableSchema> = LazyLock::new(|| {
    TableSchema::new(vec![
        Field::new("codigo_sucursal", Integer),
        Field::new("codigo_cliente", Integer),
        Field::new("ciudad", String),
        Field::new("provincia", String),
        Field::new("estado", String),
        Field::new("nombre_cliente", String),
        Field::new("cuit", String),
        Field::new("razon_social", String),
        Field::new("direccion", String),
        Field::new("dias_visita", String),
        Field::new("telefono", String),
        Field::new("fecha_alta", Date),
        Field::new("fecha_baja", String),
        Field::new("lat", Float),
        Field::new("long", Float),
        Field::new("condicion_venta", String),
        Field::new("deuda_vencida", Float),
        Field::new("tipo_negocio", String),
    ])
});

/// Schema of the per-destination ledger metadata table.
static LEDGER_SCHEMA: LazyLock<TableSchema> = LazyLock::new(|| {
    TableSchema::new(vec![
        Field::new("source_file", String),
        Field::new("process_date", Timestamp),
        Field::new("rows_loaded", Integer),
    ])
});

impl Category {
    /// The fixed column schema for this category's destination table.
    pub fn schema(&self) -> &'static TableSchema {
        match self {
            Category::Sales => &SALES_SCHEMA,
            Category::Stock => &STOCK_SCHEMA,
            Category::Customer => &CUSTOMER_SCHEMA,
        }
    }
}

/// The schema of ledger metadata tables.
pub fn ledger_schema() -> &'static TableSchema {
    &LEDGER_SCHEMA
}
