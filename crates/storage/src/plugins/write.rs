#![forbid(unsafe_code)]

use crate::driver::Driver;
use crate::error::StoreError;
use crate::views::{PropertyMap, ViewSpec};
use calsvc_core::{CalTime, Fields, Value, ValueKind};
use rusqlite::types::Value as SqlValue;

pub(crate) type Column = (String, SqlValue);

/// Physical columns for one property value. Calendar time expands into
/// `<base>_type` plus the matching representation column; the other
/// column is cleared.
pub(crate) fn columns_for(map: &PropertyMap, value: Value) -> Result<Vec<Column>, StoreError> {
    let base = map.column;
    let kind = map.property.kind();
    let single = |value: SqlValue| Ok(vec![(base.to_string(), value)]);
    match (kind, value) {
        (ValueKind::CalTime, Value::Null) => Ok(vec![
            (format!("{base}_type"), SqlValue::Null),
            (format!("{base}_utime"), SqlValue::Null),
            (format!("{base}_datetime"), SqlValue::Null),
        ]),
        (ValueKind::CalTime, Value::CalTime(time)) => {
            let (utime, datetime) = match time {
                CalTime::Utime(utime) => (SqlValue::Integer(utime), SqlValue::Null),
                CalTime::LocalTime(local) => (SqlValue::Null, SqlValue::Text(local.to_db_string())),
            };
            Ok(vec![
                (
                    format!("{base}_type"),
                    SqlValue::Integer(i64::from(time.type_code())),
                ),
                (format!("{base}_utime"), utime),
                (format!("{base}_datetime"), datetime),
            ])
        }
        (ValueKind::Children, _) => Err(StoreError::InvalidParameter(
            "child collections are not column values",
        )),
        (_, Value::Null) => single(SqlValue::Null),
        (ValueKind::Int | ValueKind::Int64, Value::Int(v)) => {
            single(SqlValue::Integer(i64::from(v)))
        }
        (ValueKind::Int | ValueKind::Int64, Value::Int64(v)) => single(SqlValue::Integer(v)),
        (ValueKind::Double, Value::Double(v)) => single(SqlValue::Real(v)),
        (ValueKind::Text, Value::Text(v)) => single(SqlValue::Text(v)),
        _ => Err(StoreError::InvalidParameter(
            "value does not match the property type",
        )),
    }
}

/// Every writable column of the view, taken from `fields`.
pub(crate) fn full_columns(
    spec: &ViewSpec,
    fields: &dyn Fields,
) -> Result<Vec<Column>, StoreError> {
    let mut columns = Vec::new();
    for map in spec.properties().filter(|map| map.writable) {
        let value = fields.value(map.property).unwrap_or(Value::Null);
        columns.extend(columns_for(map, value)?);
    }
    Ok(columns)
}

/// Columns of the dirty properties only.
pub(crate) fn dirty_columns(
    spec: &ViewSpec,
    fields: &dyn Fields,
) -> Result<Vec<Column>, StoreError> {
    let mut columns = Vec::new();
    for property in fields.dirty().iter() {
        let map = spec
            .map(property)
            .ok_or(StoreError::InvalidParameter("modified property is not part of the view"))?;
        if !map.writable {
            return Err(StoreError::InvalidParameter("modified property is read-only"));
        }
        let value = fields.value(property).unwrap_or(Value::Null);
        columns.extend(columns_for(map, value)?);
    }
    Ok(columns)
}

/// Partial update when `fields` carries dirty properties, full rewrite
/// of the writable columns otherwise. Returns the affected row count.
pub(crate) fn apply_update(
    driver: &Driver,
    spec: &ViewSpec,
    table: &str,
    id: i32,
    fields: &dyn Fields,
    extra: Vec<Column>,
) -> Result<usize, StoreError> {
    let mut columns = if fields.dirty().is_empty() {
        full_columns(spec, fields)?
    } else {
        dirty_columns(spec, fields)?
    };
    columns.extend(extra);
    update_row(driver, table, id, columns)
}

pub(crate) fn insert_row(
    driver: &Driver,
    table: &str,
    columns: Vec<Column>,
) -> Result<i32, StoreError> {
    let (names, values): (Vec<String>, Vec<SqlValue>) = columns.into_iter().unzip();
    let sql = if names.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        let placeholders = vec!["?"; names.len()].join(", ");
        format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            names.join(", ")
        )
    };
    driver.execute(&sql, &values)?;
    i32::try_from(driver.last_insert_id()).map_err(|_| StoreError::DbFailed("row id exceeds i32"))
}

pub(crate) fn update_row(
    driver: &Driver,
    table: &str,
    id: i32,
    columns: Vec<Column>,
) -> Result<usize, StoreError> {
    if columns.is_empty() {
        return Ok(0);
    }
    let (names, mut values): (Vec<String>, Vec<SqlValue>) = columns.into_iter().unzip();
    let assignments = names
        .iter()
        .map(|name| format!("{name} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    values.push(SqlValue::Integer(i64::from(id)));
    driver.execute(&format!("UPDATE {table} SET {assignments} WHERE id = ?"), &values)
}

pub(crate) fn int(value: impl Into<i64>) -> SqlValue {
    SqlValue::Integer(value.into())
}

pub(crate) fn column(name: &str, value: SqlValue) -> Column {
    (name.to_string(), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::view_spec;
    use calsvc_core::record::Todo;
    use calsvc_core::{LocalDateTime, PropertyId, ViewId};

    #[test]
    fn caltime_expands_into_three_columns() {
        let spec = view_spec(ViewId::Todo);
        let map = spec.map(PropertyId::Due).expect("due");
        let local = LocalDateTime::try_new(2024, 5, 1, 8, 30, 0).expect("valid");
        let columns = columns_for(map, Value::CalTime(CalTime::LocalTime(local))).expect("local");
        assert_eq!(
            columns,
            vec![
                ("dtend_type".to_string(), SqlValue::Integer(1)),
                ("dtend_utime".to_string(), SqlValue::Null),
                ("dtend_datetime".to_string(), SqlValue::Text("20240501T083000".to_string())),
            ]
        );
        let cleared = columns_for(map, Value::Null).expect("null");
        assert!(cleared.iter().all(|(_, value)| *value == SqlValue::Null));
    }

    #[test]
    fn dirty_columns_cover_only_marked_properties() {
        let spec = view_spec(ViewId::Todo);
        let mut todo = Todo::new(1);
        todo.summary = Some("unchanged".to_string());
        todo.set_progress(40);
        let columns = dirty_columns(spec, &todo).expect("columns");
        assert_eq!(columns, vec![("progress".to_string(), SqlValue::Integer(40))]);

        todo.assign(PropertyId::CreatedVersion, Value::Int64(9));
        assert!(matches!(
            dirty_columns(spec, &todo),
            Err(StoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let spec = view_spec(ViewId::Todo);
        let map = spec.map(PropertyId::Summary).expect("summary");
        assert!(matches!(
            columns_for(map, Value::Int(1)),
            Err(StoreError::InvalidParameter(_))
        ));
    }
}
