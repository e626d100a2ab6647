#![forbid(unsafe_code)]

//! Query compiler: filter trees, projections and sort keys to SQL fragments.
//!
//! Identifiers come only from the static view descriptors. Text operands are
//! always bound; numeric operands are inlined as literals.

use crate::error::StoreError;
use crate::views::{PropertyMap, TimeModel, ViewSpec};
use calsvc_core::caltime::{TYPE_LOCALTIME, TYPE_UTIME};
use calsvc_core::{
    AttributeFilter, CalTime, CompositeFilter, Condition, Filter, LogicalOp, NumericOp, PropertyId,
    Sort, TextMatch, ValueKind,
};
use rusqlite::types::Value as SqlValue;
use std::fmt::Write as _;

pub const LIKE_ESCAPE: char = '\\';

/// How the columns of one selected property are read back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Int,
    Int64,
    Double,
    Text,
    /// `<base>_type`, `<base>_utime`, `<base>_datetime`.
    MixedTime,
    UtimeOnly,
    LocalOnly,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedProperty {
    pub property: PropertyId,
    pub columns: Vec<String>,
    pub shape: Shape,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledQuery {
    /// Condition without the `WHERE` keyword; empty when unfiltered.
    pub where_clause: String,
    /// Sort terms without `ORDER BY`; empty when unsorted.
    pub order_clause: String,
    pub select: Vec<SelectedProperty>,
    pub params: Vec<SqlValue>,
}

impl CompiledQuery {
    pub fn select_sql(&self, source: &str, distinct: bool, offset: u32, limit: u32) -> String {
        let mut sql = String::from("SELECT ");
        if distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.column_list());
        let _ = write!(sql, " FROM {source}");
        self.push_where(&mut sql);
        if !self.order_clause.is_empty() {
            let _ = write!(sql, " ORDER BY {}", self.order_clause);
        }
        if limit > 0 || offset > 0 {
            // SQLite reads a negative limit as "no limit".
            let limit = if limit == 0 { -1 } else { i64::from(limit) };
            let _ = write!(sql, " LIMIT {limit} OFFSET {offset}");
        }
        sql
    }

    pub fn count_sql(&self, source: &str, distinct: bool) -> String {
        let mut sql = if distinct {
            format!("SELECT COUNT(*) FROM (SELECT DISTINCT {} FROM {source}", self.column_list())
        } else {
            format!("SELECT COUNT(*) FROM {source}")
        };
        self.push_where(&mut sql);
        if distinct {
            sql.push(')');
        }
        sql
    }

    fn column_list(&self) -> String {
        self.select
            .iter()
            .flat_map(|selected| selected.columns.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn push_where(&self, sql: &mut String) {
        if !self.where_clause.is_empty() {
            let _ = write!(sql, " WHERE {}", self.where_clause);
        }
    }
}

pub fn compile(
    spec: &ViewSpec,
    filter: Option<&Filter>,
    projection: &[PropertyId],
    sort: Option<Sort>,
) -> Result<CompiledQuery, StoreError> {
    let (where_clause, params) = match filter {
        Some(filter) => compile_filter(spec, filter)?,
        None => (String::new(), Vec::new()),
    };
    Ok(CompiledQuery {
        where_clause,
        order_clause: compile_order(spec, sort)?,
        select: compile_projection(spec, projection),
        params,
    })
}

pub fn compile_filter(
    spec: &ViewSpec,
    filter: &Filter,
) -> Result<(String, Vec<SqlValue>), StoreError> {
    let mut sql = String::new();
    let mut params = Vec::new();
    compile_node(spec, filter, &mut sql, &mut params)?;
    Ok((sql, params))
}

fn compile_node(
    spec: &ViewSpec,
    filter: &Filter,
    sql: &mut String,
    params: &mut Vec<SqlValue>,
) -> Result<(), StoreError> {
    match filter {
        Filter::Attribute(attribute) => compile_attribute(spec, attribute, sql, params),
        Filter::Composite(composite) => compile_composite(spec, composite, sql, params),
    }
}

fn compile_composite(
    spec: &ViewSpec,
    composite: &CompositeFilter,
    sql: &mut String,
    params: &mut Vec<SqlValue>,
) -> Result<(), StoreError> {
    if composite.is_empty() {
        return Err(StoreError::InvalidParameter("composite filter has no conditions"));
    }
    if composite.operators().len() + 1 != composite.children().len() {
        return Err(StoreError::InvalidParameter(
            "composite filter needs one operator between each pair of children",
        ));
    }
    for (index, child) in composite.children().iter().enumerate() {
        if index > 0 {
            sql.push_str(match composite.operators()[index - 1] {
                LogicalOp::And => " AND ",
                LogicalOp::Or => " OR ",
            });
        }
        sql.push('(');
        compile_node(spec, child, sql, params)?;
        sql.push(')');
    }
    Ok(())
}

fn compile_attribute(
    spec: &ViewSpec,
    attribute: &AttributeFilter,
    sql: &mut String,
    params: &mut Vec<SqlValue>,
) -> Result<(), StoreError> {
    let map = spec
        .map(attribute.property)
        .ok_or(StoreError::InvalidParameter("filter property is not part of the view"))?;
    let kind = attribute.property.kind();
    match &attribute.condition {
        Condition::Int { op, value } => {
            expect_kind(kind, &[ValueKind::Int, ValueKind::Int64])?;
            push_numeric(sql, map.column, *op, &value.to_string());
        }
        Condition::Int64 { op, value } => {
            expect_kind(kind, &[ValueKind::Int, ValueKind::Int64])?;
            push_numeric(sql, map.column, *op, &value.to_string());
        }
        Condition::Double { op, value } => {
            expect_kind(kind, &[ValueKind::Double])?;
            if !value.is_finite() {
                return Err(StoreError::InvalidParameter("double filter value must be finite"));
            }
            push_numeric(sql, map.column, *op, &value.to_string());
        }
        Condition::Text { mode, value } => {
            expect_kind(kind, &[ValueKind::Text])?;
            push_text(sql, params, map.column, *mode, value);
        }
        Condition::CalTime { op, value } => {
            expect_kind(kind, &[ValueKind::CalTime])?;
            push_caltime(sql, params, spec.time_model, map, *op, value)?;
        }
    }
    Ok(())
}

fn expect_kind(kind: ValueKind, accepted: &[ValueKind]) -> Result<(), StoreError> {
    if accepted.contains(&kind) {
        Ok(())
    } else {
        Err(StoreError::InvalidParameter("filter value does not match the property type"))
    }
}

fn operator_sql(op: NumericOp) -> Option<&'static str> {
    Some(match op {
        NumericOp::Equal => "=",
        NumericOp::GreaterThan => ">",
        NumericOp::GreaterOrEqual => ">=",
        NumericOp::LessThan => "<",
        NumericOp::LessOrEqual => "<=",
        NumericOp::NotEqual => "<>",
        NumericOp::None => return None,
    })
}

fn push_numeric(sql: &mut String, column: &str, op: NumericOp, literal: &str) {
    match operator_sql(op) {
        Some(op) => {
            let _ = write!(sql, "{column} {op} {literal}");
        }
        None => {
            let _ = write!(sql, "{column} IS NULL");
        }
    }
}

fn push_text(
    sql: &mut String,
    params: &mut Vec<SqlValue>,
    column: &str,
    mode: TextMatch,
    value: &str,
) {
    let pattern = match mode {
        TextMatch::Exists => {
            let _ = write!(sql, "{column} IS NOT NULL");
            return;
        }
        TextMatch::Exactly => {
            let _ = write!(sql, "{column} = ?");
            params.push(SqlValue::Text(value.to_string()));
            return;
        }
        TextMatch::Fullstring => escape_like(value),
        TextMatch::Contains => format!("%{}%", escape_like(value)),
        TextMatch::StartsWith => format!("{}%", escape_like(value)),
        TextMatch::EndsWith => format!("%{}", escape_like(value)),
    };
    let _ = write!(sql, "{column} LIKE ? ESCAPE '{LIKE_ESCAPE}'");
    params.push(SqlValue::Text(pattern));
}

/// Escapes LIKE wildcards, quotes and the escape character itself.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\'' | '_' | '%' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

fn push_caltime(
    sql: &mut String,
    params: &mut Vec<SqlValue>,
    model: TimeModel,
    map: &PropertyMap,
    op: NumericOp,
    value: &CalTime,
) -> Result<(), StoreError> {
    let base = map.column;
    match model {
        TimeModel::Mixed => {
            let Some(op) = operator_sql(op) else {
                let _ = write!(sql, "{base}_type IS NULL");
                return Ok(());
            };
            match value {
                CalTime::Utime(utime) => {
                    let _ = write!(sql, "{base}_utime {op} {utime} AND {base}_type = {TYPE_UTIME}");
                }
                CalTime::LocalTime(local) => {
                    let _ = write!(
                        sql,
                        "{base}_datetime {op} ? AND {base}_type = {TYPE_LOCALTIME}"
                    );
                    params.push(SqlValue::Text(local.to_db_string()));
                }
            }
        }
        TimeModel::UtimeOnly => {
            let column = format!("{base}_utime");
            match (operator_sql(op), value) {
                (None, _) => {
                    let _ = write!(sql, "{column} IS NULL");
                }
                (Some(op), CalTime::Utime(utime)) => {
                    let _ = write!(sql, "{column} {op} {utime}");
                }
                (Some(_), CalTime::LocalTime(_)) => {
                    return Err(StoreError::InvalidParameter(
                        "utime instance view cannot be filtered by local time",
                    ));
                }
            }
        }
        TimeModel::LocalOnly => {
            let column = format!("{base}_datetime");
            match (operator_sql(op), value) {
                (None, _) => {
                    let _ = write!(sql, "{column} IS NULL");
                }
                (Some(op), CalTime::LocalTime(local)) => {
                    let _ = write!(sql, "{column} {op} ?");
                    params.push(SqlValue::Text(local.to_db_string()));
                }
                (Some(_), CalTime::Utime(_)) => {
                    return Err(StoreError::InvalidParameter(
                        "local-time instance view cannot be filtered by utime",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Maps requested properties to columns. Ids the view does not carry are
/// skipped; an empty request selects every mapped property.
pub fn compile_projection(spec: &ViewSpec, projection: &[PropertyId]) -> Vec<SelectedProperty> {
    let maps: Vec<&PropertyMap> = if projection.is_empty() {
        spec.properties().collect()
    } else {
        let mut maps: Vec<&PropertyMap> = Vec::with_capacity(projection.len());
        for property in projection {
            let Some(map) = spec.map(*property) else {
                continue;
            };
            if !maps.iter().any(|seen| seen.property == map.property) {
                maps.push(map);
            }
        }
        maps
    };
    maps.into_iter()
        .filter_map(|map| select_property(spec.time_model, map))
        .collect()
}

fn select_property(model: TimeModel, map: &PropertyMap) -> Option<SelectedProperty> {
    let base = map.column;
    let (shape, columns) = match map.property.kind() {
        ValueKind::Children => return None,
        ValueKind::Int => (Shape::Int, vec![base.to_string()]),
        ValueKind::Int64 => (Shape::Int64, vec![base.to_string()]),
        ValueKind::Double => (Shape::Double, vec![base.to_string()]),
        ValueKind::Text => (Shape::Text, vec![base.to_string()]),
        ValueKind::CalTime => match model {
            TimeModel::Mixed => (
                Shape::MixedTime,
                vec![
                    format!("{base}_type"),
                    format!("{base}_utime"),
                    format!("{base}_datetime"),
                ],
            ),
            TimeModel::UtimeOnly => (Shape::UtimeOnly, vec![format!("{base}_utime")]),
            TimeModel::LocalOnly => (Shape::LocalOnly, vec![format!("{base}_datetime")]),
        },
    };
    Some(SelectedProperty {
        property: map.property,
        columns,
        shape,
    })
}

pub fn compile_order(spec: &ViewSpec, sort: Option<Sort>) -> Result<String, StoreError> {
    let Some(sort) = sort else {
        return Ok(String::new());
    };
    let map = spec
        .map(sort.property)
        .ok_or(StoreError::InvalidParameter("sort property is not part of the view"))?;
    let direction = if sort.ascending { "ASC" } else { "DESC" };
    let base = map.column;
    Ok(match (sort.property.kind(), spec.time_model) {
        (ValueKind::Children, _) => {
            return Err(StoreError::InvalidParameter("child collections cannot be sorted"));
        }
        (ValueKind::CalTime, TimeModel::Mixed) => {
            format!("{base}_utime {direction}, {base}_datetime {direction}")
        }
        (ValueKind::CalTime, TimeModel::UtimeOnly) => format!("{base}_utime {direction}"),
        (ValueKind::CalTime, TimeModel::LocalOnly) => format!("{base}_datetime {direction}"),
        _ => format!("{base} {direction}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::driver::Driver;
    use crate::views::{ro, view_spec};
    use calsvc_core::{LocalDateTime, ViewId};
    use proptest::prelude::*;

    const PROBE_PROPERTIES: &[PropertyMap] = &[
        ro(PropertyId::Id, "id"),
        ro(PropertyId::Priority, "priority"),
        ro(PropertyId::Progress, "progress"),
        ro(PropertyId::CompletedTime, "completed"),
        ro(PropertyId::Summary, "summary"),
    ];

    static PROBE: ViewSpec = ViewSpec {
        source: "probe",
        table: Some("probe"),
        time_model: TimeModel::Mixed,
        segments: &[PROBE_PROPERTIES],
    };

    fn local(year: i32, month: u8, mday: u8) -> CalTime {
        CalTime::LocalTime(LocalDateTime::date(year, month, mday).expect("valid date"))
    }

    #[test]
    fn composite_children_are_parenthesized_and_joined() {
        let filter = CompositeFilter::with(AttributeFilter::int(
            PropertyId::Priority,
            NumericOp::GreaterOrEqual,
            2,
        ))
        .or(AttributeFilter::text(
            PropertyId::Summary,
            TextMatch::Exactly,
            "o'clock",
        ))
        .and(AttributeFilter::int64(
            PropertyId::CompletedTime,
            NumericOp::None,
            0,
        ));
        let (sql, params) =
            compile_filter(view_spec(ViewId::Todo), &filter.into()).expect("compile");
        assert_eq!(
            sql,
            "(priority >= 2) OR (summary = ?) AND (completed_time IS NULL)"
        );
        assert_eq!(params, vec![SqlValue::Text("o'clock".to_string())]);
    }

    #[test]
    fn nested_composites_recurse() {
        let inner = CompositeFilter::with(AttributeFilter::int(
            PropertyId::Status,
            NumericOp::Equal,
            1,
        ))
        .or(AttributeFilter::int(PropertyId::Status, NumericOp::Equal, 3));
        let outer = CompositeFilter::with(inner).and(AttributeFilter::double(
            PropertyId::Latitude,
            NumericOp::LessThan,
            -12.5,
        ));
        let (sql, _) = compile_filter(view_spec(ViewId::Event), &outer.into()).expect("compile");
        assert_eq!(sql, "((status = 1) OR (status = 3)) AND (latitude < -12.5)");
    }

    #[test]
    fn empty_composite_is_rejected() {
        let err = compile_filter(view_spec(ViewId::Todo), &CompositeFilter::new().into())
            .expect_err("empty composite");
        assert!(matches!(err, StoreError::InvalidParameter(_)));
    }

    #[test]
    fn unknown_or_mistyped_leaf_is_rejected() {
        let foreign = AttributeFilter::int(PropertyId::TzOffsetFromGmt, NumericOp::Equal, 0);
        assert!(matches!(
            compile_filter(view_spec(ViewId::Todo), &foreign.into()),
            Err(StoreError::InvalidParameter(_))
        ));
        let mistyped = AttributeFilter::text(PropertyId::Priority, TextMatch::Exactly, "1");
        assert!(matches!(
            compile_filter(view_spec(ViewId::Todo), &mistyped.into()),
            Err(StoreError::InvalidParameter(_))
        ));
        let nan = AttributeFilter::double(PropertyId::Latitude, NumericOp::Equal, f64::NAN);
        assert!(matches!(
            compile_filter(view_spec(ViewId::Event), &nan.into()),
            Err(StoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn like_patterns_are_escaped_and_bound() {
        assert_eq!(escape_like(r"50%_off\'"), r"50\%\_off\\\'");
        let filter = AttributeFilter::text(PropertyId::Summary, TextMatch::Contains, "10%");
        let (sql, params) =
            compile_filter(view_spec(ViewId::Todo), &filter.into()).expect("compile");
        assert_eq!(sql, r"summary LIKE ? ESCAPE '\'");
        assert_eq!(params, vec![SqlValue::Text(r"%10\%%".to_string())]);

        let exists = AttributeFilter::text(PropertyId::Location, TextMatch::Exists, "");
        let (sql, params) =
            compile_filter(view_spec(ViewId::Todo), &exists.into()).expect("compile");
        assert_eq!(sql, "location IS NOT NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn caltime_in_mixed_view_adds_type_guard() {
        let utime = AttributeFilter::caltime(
            PropertyId::Start,
            NumericOp::GreaterThan,
            CalTime::Utime(1_700_000_000),
        );
        let (sql, _) = compile_filter(view_spec(ViewId::Event), &utime.into()).expect("utime");
        assert_eq!(sql, "dtstart_utime > 1700000000 AND dtstart_type = 0");

        let floating =
            AttributeFilter::caltime(PropertyId::Due, NumericOp::LessOrEqual, local(2024, 2, 29));
        let (sql, params) =
            compile_filter(view_spec(ViewId::Todo), &floating.into()).expect("local");
        assert_eq!(sql, "dtend_datetime <= ? AND dtend_type = 1");
        assert_eq!(params, vec![SqlValue::Text("20240229T000000".to_string())]);
    }

    #[test]
    fn caltime_in_instance_view_uses_one_column() {
        let utime = AttributeFilter::caltime(
            PropertyId::Start,
            NumericOp::GreaterOrEqual,
            CalTime::Utime(10),
        );
        let (sql, _) = compile_filter(view_spec(ViewId::InstanceUtimeBook), &utime.clone().into())
            .expect("utime instance");
        assert_eq!(sql, "dtstart_utime >= 10");
        assert!(matches!(
            compile_filter(view_spec(ViewId::InstanceLocaltimeBook), &utime.into()),
            Err(StoreError::InvalidParameter(_))
        ));

        let floating =
            AttributeFilter::caltime(PropertyId::End, NumericOp::LessThan, local(2025, 1, 1));
        let (sql, _) = compile_filter(view_spec(ViewId::InstanceLocaltimeBook), &floating.into())
            .expect("local instance");
        assert_eq!(sql, "dtend_datetime < ?");
    }

    #[test]
    fn projection_skips_unknown_properties() {
        let selected = compile_projection(
            view_spec(ViewId::Todo),
            &[
                PropertyId::Summary,
                PropertyId::StandardName,
                PropertyId::Alarms,
                PropertyId::Due,
                PropertyId::Summary,
            ],
        );
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].columns, vec!["summary".to_string()]);
        assert_eq!(selected[1].shape, Shape::MixedTime);
        assert_eq!(
            selected[1].columns,
            vec!["dtend_type", "dtend_utime", "dtend_datetime"]
        );

        let all = compile_projection(view_spec(ViewId::Timezone), &[]);
        assert_eq!(all.len(), view_spec(ViewId::Timezone).properties().count());
    }

    #[test]
    fn order_covers_both_time_representations() {
        let mixed = compile_order(
            view_spec(ViewId::Event),
            Some(Sort {
                property: PropertyId::Start,
                ascending: false,
            }),
        )
        .expect("mixed");
        assert_eq!(mixed, "dtstart_utime DESC, dtstart_datetime DESC");

        let instance = compile_order(
            view_spec(ViewId::InstanceLocaltimeBook),
            Some(Sort {
                property: PropertyId::Start,
                ascending: true,
            }),
        )
        .expect("instance");
        assert_eq!(instance, "dtstart_datetime ASC");

        assert_eq!(compile_order(view_spec(ViewId::Event), None).expect("none"), "");
        assert!(matches!(
            compile_order(
                view_spec(ViewId::Event),
                Some(Sort {
                    property: PropertyId::Alarms,
                    ascending: true,
                })
            ),
            Err(StoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn select_sql_pages_and_counts() {
        let compiled = compile(
            &PROBE,
            Some(&AttributeFilter::int(PropertyId::Priority, NumericOp::Equal, 1).into()),
            &[PropertyId::Id],
            Some(Sort {
                property: PropertyId::Progress,
                ascending: true,
            }),
        )
        .expect("compile");
        assert_eq!(
            compiled.select_sql("probe", true, 5, 0),
            "SELECT DISTINCT id FROM probe WHERE priority = 1 ORDER BY progress ASC LIMIT -1 OFFSET 5"
        );
        assert_eq!(
            compiled.select_sql("probe", false, 0, 0),
            "SELECT id FROM probe WHERE priority = 1 ORDER BY progress ASC"
        );
        assert_eq!(
            compiled.count_sql("probe", true),
            "SELECT COUNT(*) FROM (SELECT DISTINCT id FROM probe WHERE priority = 1)"
        );
    }

    #[derive(Clone, Debug)]
    struct ProbeRow {
        priority: i32,
        progress: i32,
        completed: i64,
        summary: String,
    }

    #[derive(Clone, Debug)]
    enum Leaf {
        Priority(NumericOp, i32),
        Progress(NumericOp, i32),
        Completed(NumericOp, i64),
        Summary(TextMatch, String),
    }

    fn holds(op: NumericOp, left: i64, right: i64) -> bool {
        match op {
            NumericOp::Equal => left == right,
            NumericOp::GreaterThan => left > right,
            NumericOp::GreaterOrEqual => left >= right,
            NumericOp::LessThan => left < right,
            NumericOp::LessOrEqual => left <= right,
            NumericOp::NotEqual => left != right,
            NumericOp::None => false,
        }
    }

    impl Leaf {
        fn filter(&self) -> AttributeFilter {
            match self {
                Self::Priority(op, v) => AttributeFilter::int(PropertyId::Priority, *op, *v),
                Self::Progress(op, v) => AttributeFilter::int(PropertyId::Progress, *op, *v),
                Self::Completed(op, v) => {
                    AttributeFilter::int64(PropertyId::CompletedTime, *op, *v)
                }
                Self::Summary(mode, v) => {
                    AttributeFilter::text(PropertyId::Summary, *mode, v.clone())
                }
            }
        }

        fn accepts(&self, row: &ProbeRow) -> bool {
            match self {
                Self::Priority(op, v) => holds(*op, i64::from(row.priority), i64::from(*v)),
                Self::Progress(op, v) => holds(*op, i64::from(row.progress), i64::from(*v)),
                Self::Completed(op, v) => holds(*op, row.completed, *v),
                Self::Summary(TextMatch::Exactly, v) => row.summary == *v,
                Self::Summary(TextMatch::Contains, v) => row.summary.contains(v.as_str()),
                Self::Summary(TextMatch::StartsWith, v) => row.summary.starts_with(v.as_str()),
                Self::Summary(TextMatch::EndsWith, v) => row.summary.ends_with(v.as_str()),
                Self::Summary(TextMatch::Fullstring, v) => row.summary == *v,
                Self::Summary(TextMatch::Exists, _) => true,
            }
        }
    }

    fn numeric_op() -> impl Strategy<Value = NumericOp> {
        prop_oneof![
            Just(NumericOp::Equal),
            Just(NumericOp::GreaterThan),
            Just(NumericOp::GreaterOrEqual),
            Just(NumericOp::LessThan),
            Just(NumericOp::LessOrEqual),
            Just(NumericOp::NotEqual),
        ]
    }

    fn text_mode() -> impl Strategy<Value = TextMatch> {
        prop_oneof![
            Just(TextMatch::Exactly),
            Just(TextMatch::Fullstring),
            Just(TextMatch::Contains),
            Just(TextMatch::StartsWith),
            Just(TextMatch::EndsWith),
            Just(TextMatch::Exists),
        ]
    }

    fn leaf() -> impl Strategy<Value = Leaf> {
        prop_oneof![
            (numeric_op(), -3i32..4).prop_map(|(op, v)| Leaf::Priority(op, v)),
            (numeric_op(), -3i32..4).prop_map(|(op, v)| Leaf::Progress(op, v)),
            (numeric_op(), -3i64..4).prop_map(|(op, v)| Leaf::Completed(op, v)),
            (text_mode(), "[ab%_]{0,2}").prop_map(|(mode, v)| Leaf::Summary(mode, v)),
        ]
    }

    fn probe_row() -> impl Strategy<Value = ProbeRow> {
        (-3i32..4, -3i32..4, -3i64..4, "[ab%_]{0,3}").prop_map(
            |(priority, progress, completed, summary)| ProbeRow {
                priority,
                progress,
                completed,
                summary,
            },
        )
    }

    fn load_probe(rows: &[ProbeRow]) -> Driver {
        let driver = Driver::open_in_memory(&StoreConfig::default()).expect("open");
        driver
            .exec(
                "CREATE TABLE probe (id INTEGER PRIMARY KEY, priority INTEGER NOT NULL, \
                 progress INTEGER NOT NULL, completed INTEGER NOT NULL, summary TEXT NOT NULL)",
            )
            .expect("schema");
        for (index, row) in rows.iter().enumerate() {
            driver
                .execute(
                    "INSERT INTO probe(id, priority, progress, completed, summary) \
                     VALUES (?, ?, ?, ?, ?)",
                    &[
                        SqlValue::Integer(index as i64),
                        SqlValue::Integer(i64::from(row.priority)),
                        SqlValue::Integer(i64::from(row.progress)),
                        SqlValue::Integer(row.completed),
                        SqlValue::Text(row.summary.clone()),
                    ],
                )
                .expect("insert");
        }
        driver
    }

    #[test]
    fn row_missing_one_conjunct_is_excluded() {
        let rows = vec![
            ProbeRow {
                priority: 2,
                progress: 1,
                completed: 0,
                summary: "ab".to_string(),
            },
            ProbeRow {
                priority: 2,
                progress: 1,
                completed: 0,
                summary: "a%".to_string(),
            },
        ];
        let driver = load_probe(&rows);
        let filter = CompositeFilter::with(AttributeFilter::int(
            PropertyId::Priority,
            NumericOp::Equal,
            2,
        ))
        .and(AttributeFilter::int(PropertyId::Progress, NumericOp::LessOrEqual, 1))
        .and(AttributeFilter::text(
            PropertyId::Summary,
            TextMatch::EndsWith,
            "%",
        ));
        let compiled = compile(&PROBE, Some(&filter.into()), &[PropertyId::Id], None)
            .expect("compile");
        let ids = driver
            .query(
                &compiled.select_sql(PROBE.source, false, 0, 0),
                &compiled.params,
                |row| row.get::<_, i64>(0),
            )
            .expect("query");
        assert_eq!(ids, vec![1]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn conjunction_accepts_exactly_rows_meeting_every_leaf(
            rows in prop::collection::vec(probe_row(), 1..24),
            leaves in prop::collection::vec(leaf(), 1..5),
        ) {
            let driver = load_probe(&rows);
            let mut composite = CompositeFilter::new();
            for leaf in &leaves {
                composite = composite.and(leaf.filter());
            }
            let compiled = compile(
                &PROBE,
                Some(&composite.into()),
                &[PropertyId::Id],
                Some(Sort { property: PropertyId::Id, ascending: true }),
            )
            .expect("compile");
            let actual = driver
                .query(
                    &compiled.select_sql(PROBE.source, false, 0, 0),
                    &compiled.params,
                    |row| row.get::<_, i64>(0),
                )
                .expect("query");
            let expected: Vec<i64> = rows
                .iter()
                .enumerate()
                .filter(|(_, row)| leaves.iter().all(|leaf| leaf.accepts(row)))
                .map(|(index, _)| index as i64)
                .collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
