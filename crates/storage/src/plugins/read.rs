#![forbid(unsafe_code)]

use crate::compiler::{Shape, SelectedProperty, compile};
use crate::driver::Driver;
use crate::error::StoreError;
use crate::views::ViewSpec;
use calsvc_core::{
    AttributeFilter, CalTime, Filter, LocalDateTime, NumericOp, PropertyId, Query, Record, Sort,
    Value, ViewId,
};
use rusqlite::Row;
use tracing::debug;

pub(crate) fn select_records(
    driver: &Driver,
    view: ViewId,
    spec: &ViewSpec,
    query: &Query,
    offset: u32,
    limit: u32,
) -> Result<Vec<Record>, StoreError> {
    select_from(
        driver,
        view,
        spec,
        spec.source,
        query.filter.as_ref(),
        &query.projection,
        query.sort,
        query.distinct,
        offset,
        limit,
    )
}

/// Reads one full row by `Id` from `source`, which must expose the same
/// columns as the view.
pub(crate) fn select_by_id(
    driver: &Driver,
    view: ViewId,
    spec: &ViewSpec,
    source: &str,
    id: i32,
) -> Result<Option<Record>, StoreError> {
    let filter = Filter::from(AttributeFilter::int(PropertyId::Id, NumericOp::Equal, id));
    let mut rows = select_from(driver, view, spec, source, Some(&filter), &[], None, false, 0, 1)?;
    Ok(rows.pop())
}

/// Rows of a child view owned by one parent, in insertion order.
pub(crate) fn select_owned(
    driver: &Driver,
    view: ViewId,
    spec: &ViewSpec,
    filter: Filter,
) -> Result<Vec<Record>, StoreError> {
    let sort = Sort {
        property: PropertyId::Id,
        ascending: true,
    };
    select_from(driver, view, spec, spec.source, Some(&filter), &[], Some(sort), false, 0, 0)
}

#[allow(clippy::too_many_arguments)]
fn select_from(
    driver: &Driver,
    view: ViewId,
    spec: &ViewSpec,
    source: &str,
    filter: Option<&Filter>,
    projection: &[PropertyId],
    sort: Option<Sort>,
    distinct: bool,
    offset: u32,
    limit: u32,
) -> Result<Vec<Record>, StoreError> {
    let compiled = compile(spec, filter, projection, sort)?;
    let sql = compiled.select_sql(source, distinct, offset, limit);
    debug!(view = view.as_str(), sql = %sql, "compiled query");
    driver.query(&sql, &compiled.params, |row| {
        hydrate_row(view, &compiled.select, row)
    })
}

pub(crate) fn count_records(
    driver: &Driver,
    view: ViewId,
    spec: &ViewSpec,
    query: &Query,
) -> Result<i32, StoreError> {
    let compiled = compile(spec, query.filter.as_ref(), &query.projection, None)?;
    let sql = compiled.count_sql(spec.source, query.distinct);
    debug!(view = view.as_str(), sql = %sql, "compiled count");
    let count = driver.scalar_int(&sql, &compiled.params)?;
    i32::try_from(count).map_err(|_| StoreError::DbFailed("row count exceeds i32"))
}

fn hydrate_row(
    view: ViewId,
    select: &[SelectedProperty],
    row: &Row<'_>,
) -> rusqlite::Result<Record> {
    let mut record = view.blank_record();
    let mut index = 0;
    for selected in select {
        let value = read_value(row, &mut index, selected.shape)?;
        // Null into a non-optional slot keeps the default.
        record.fields_mut().set_value(selected.property, value);
    }
    Ok(record)
}

fn read_value(row: &Row<'_>, index: &mut usize, shape: Shape) -> rusqlite::Result<Value> {
    let at = *index;
    let value = match shape {
        Shape::Int => row.get::<_, Option<i32>>(at)?.into(),
        Shape::Int64 => row.get::<_, Option<i64>>(at)?.into(),
        Shape::Double => row.get::<_, Option<f64>>(at)?.into(),
        Shape::Text => row.get::<_, Option<String>>(at)?.into(),
        Shape::MixedTime => {
            let type_code: Option<i32> = row.get(at)?;
            let utime: Option<i64> = row.get(at + 1)?;
            let datetime: Option<String> = row.get(at + 2)?;
            *index += 3;
            return Ok(CalTime::from_columns(type_code, utime, datetime.as_deref()).into());
        }
        Shape::UtimeOnly => row.get::<_, Option<i64>>(at)?.map(CalTime::Utime).into(),
        Shape::LocalOnly => row
            .get::<_, Option<String>>(at)?
            .and_then(|raw| LocalDateTime::parse_db(&raw).ok())
            .map(CalTime::LocalTime)
            .into(),
    };
    *index += 1;
    Ok(value)
}
