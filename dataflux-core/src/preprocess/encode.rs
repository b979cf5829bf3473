//! Categorical encoding.

use std::collections::{HashMap, HashSet};

use super::{EncodeMethod, HandleUnknown, TransformStep, target_columns};
use crate::dataset::{Column, Dataset, Value};
use crate::error::TransformError;

/// Categories observed for one column, in first-seen order.
#[derive(Debug, Clone, PartialEq)]
struct Categories {
    column: String,
    values: Vec<String>,
}

impl Categories {
    fn index(&self) -> HashMap<&str, usize> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (v.as_str(), i))
            .collect()
    }

    fn indicator_names(&self) -> impl Iterator<Item = String> + '_ {
        self.values
            .iter()
            .map(|category| format!("{}_{}", self.column, category))
    }
}

/// Encodes categorical columns as one-hot indicators or ordinal indices.
///
/// One-hot encoding keeps the source column and appends one Integer 0/1
/// column named `{column}_{category}` per category seen at fit. Ordinal
/// encoding replaces the values in place with the category index. Nulls are
/// not categories.
#[derive(Debug, Clone)]
pub struct Encoder {
    name: String,
    method: EncodeMethod,
    columns: Option<Vec<String>>,
    handle_unknown: HandleUnknown,
    categories: Option<Vec<Categories>>,
}

impl Encoder {
    pub fn new(method: EncodeMethod) -> Self {
        Self {
            name: format!("encode({method})"),
            method,
            columns: None,
            handle_unknown: HandleUnknown::default(),
            categories: None,
        }
    }

    pub fn one_hot() -> Self {
        Self::new(EncodeMethod::OneHot)
    }

    pub fn ordinal() -> Self {
        Self::new(EncodeMethod::Ordinal)
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_handle_unknown(mut self, handle_unknown: HandleUnknown) -> Self {
        self.handle_unknown = handle_unknown;
        self
    }

    /// Categories learned for `column`, if fitted.
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.categories
            .as_ref()?
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.values.as_slice())
    }

    fn invalid(&self, column: &str, reason: impl Into<String>) -> TransformError {
        TransformError::invalid_column(&self.name, column, reason)
    }

    /// Position of `value` among the fitted categories. `None` for nulls and,
    /// under [`HandleUnknown::Ignore`], unseen categories.
    fn lookup(
        &self,
        index: &HashMap<&str, usize>,
        column: &str,
        value: &Value,
    ) -> Result<Option<usize>, TransformError> {
        if value.is_null() {
            return Ok(None);
        }
        let key = value.to_string();
        match (index.get(key.as_str()), self.handle_unknown) {
            (Some(&i), _) => Ok(Some(i)),
            (None, HandleUnknown::Ignore) => Ok(None),
            (None, HandleUnknown::Error) => {
                Err(self.invalid(column, format!("category '{key}' was not seen during fit")))
            }
        }
    }

    fn one_hot_columns(
        &self,
        dataset: &Dataset,
        categories: &Categories,
    ) -> Result<Vec<Column>, TransformError> {
        let column = dataset
            .column(&categories.column)
            .ok_or_else(|| self.invalid(&categories.column, "column not found"))?;
        let index = categories.index();
        let mut indicators = vec![vec![0i64; column.len()]; categories.values.len()];
        for (row, value) in column.values().iter().enumerate() {
            if let Some(i) = self.lookup(&index, &categories.column, value)? {
                indicators[i][row] = 1;
            }
        }
        Ok(categories
            .indicator_names()
            .zip(indicators)
            .map(|(name, values)| Column::from_i64(name, values))
            .collect())
    }

    fn ordinal_values(
        &self,
        dataset: &Dataset,
        categories: &Categories,
    ) -> Result<Vec<Value>, TransformError> {
        let column = dataset
            .column(&categories.column)
            .ok_or_else(|| self.invalid(&categories.column, "column not found"))?;
        let index = categories.index();
        column
            .values()
            .iter()
            .map(|v| {
                let position = self.lookup(&index, &categories.column, v)?;
                Ok(position.map_or(Value::Null, |i| Value::Int(i as i64)))
            })
            .collect()
    }
}

impl TransformStep for Encoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_fit(&self) -> bool {
        true
    }

    fn is_fitted(&self) -> bool {
        self.categories.is_some()
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<(), TransformError> {
        let targets = target_columns(self.columns.as_deref(), dataset, |c| {
            c.dtype().is_categorical()
        });

        let mut fitted = Vec::with_capacity(targets.len());
        let mut new_names = HashSet::new();
        for name in targets {
            let column = dataset
                .column(&name)
                .ok_or_else(|| self.invalid(&name, "column not found"))?;

            let mut seen = HashSet::new();
            let values: Vec<String> = column
                .values()
                .iter()
                .filter(|v| !v.is_null())
                .map(Value::to_string)
                .filter(|key| seen.insert(key.clone()))
                .collect();
            let categories = Categories {
                column: name,
                values,
            };

            if self.method == EncodeMethod::OneHot {
                for indicator in categories.indicator_names() {
                    if dataset.has_column(&indicator) || !new_names.insert(indicator.clone()) {
                        return Err(self.invalid(
                            &categories.column,
                            format!("indicator column '{indicator}' already exists"),
                        ));
                    }
                }
            }
            fitted.push(categories);
        }

        tracing::debug!(step = %self.name, columns = fitted.len(), "Fitted encoder");
        self.categories = Some(fitted);
        Ok(())
    }

    fn apply(&self, dataset: &mut Dataset) -> Result<(), TransformError> {
        let fitted = self
            .categories
            .as_ref()
            .ok_or_else(|| TransformError::unfitted(&self.name))?;

        match self.method {
            EncodeMethod::OneHot => {
                let mut new_columns = Vec::new();
                for categories in fitted {
                    new_columns.extend(self.one_hot_columns(dataset, categories)?);
                }
                let mut names = HashSet::new();
                if let Some(clash) = new_columns
                    .iter()
                    .find(|c| dataset.has_column(c.name()) || !names.insert(c.name()))
                {
                    return Err(self.invalid(
                        clash.name(),
                        format!("indicator column '{}' already exists", clash.name()),
                    ));
                }
                for column in new_columns {
                    let name = column.name().to_string();
                    dataset
                        .push_column(column)
                        .map_err(|e| self.invalid(&name, e.to_string()))?;
                }
            }
            EncodeMethod::Ordinal => {
                for categories in fitted {
                    let values = self.ordinal_values(dataset, categories)?;
                    if let Some(column) = dataset.column_mut(&categories.column) {
                        column
                            .set_values(values)
                            .map_err(|e| self.invalid(&categories.column, e.to_string()))?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnType;
    use pretty_assertions::assert_eq;

    fn colors() -> Dataset {
        Dataset::new(vec![
            Column::from_i64("id", [1, 2, 3, 4]),
            Column::from_strs("color", ["red", "blue", "red", "green"]),
        ])
        .unwrap()
    }

    fn ints(ds: &Dataset, name: &str) -> Vec<Value> {
        ds.column(name).unwrap().values().to_vec()
    }

    #[test]
    fn test_one_hot() {
        let mut ds = colors();
        let mut encoder = Encoder::one_hot();
        encoder.fit(&ds).unwrap();
        encoder.apply(&mut ds).unwrap();

        assert_eq!(
            ds.column_names(),
            vec!["id", "color", "color_red", "color_blue", "color_green"]
        );
        assert_eq!(
            ints(&ds, "color_red"),
            vec![Value::Int(1), Value::Int(0), Value::Int(1), Value::Int(0)]
        );
        assert_eq!(ds.column("color_green").unwrap().dtype(), ColumnType::Integer);
    }

    #[test]
    fn test_one_hot_unseen_category_is_all_zero() {
        let mut encoder = Encoder::one_hot();
        encoder.fit(&colors()).unwrap();

        let mut ds = Dataset::new(vec![Column::from_strs("color", ["purple"])]).unwrap();
        encoder.apply(&mut ds).unwrap();
        for name in ["color_red", "color_blue", "color_green"] {
            assert_eq!(ints(&ds, name), vec![Value::Int(0)]);
        }
    }

    #[test]
    fn test_one_hot_unseen_category_error_policy() {
        let mut encoder = Encoder::one_hot().with_handle_unknown(HandleUnknown::Error);
        encoder.fit(&colors()).unwrap();

        let mut ds = Dataset::new(vec![Column::from_strs("color", ["purple"])]).unwrap();
        let err = encoder.apply(&mut ds).unwrap_err();
        assert!(matches!(err, TransformError::InvalidColumn { column, .. } if column == "color"));
    }

    #[test]
    fn test_one_hot_nulls_are_not_categories() {
        let mut ds = Dataset::new(vec![Column::from_options("c", [Some("a"), None])]).unwrap();
        let mut encoder = Encoder::one_hot();
        encoder.fit(&ds).unwrap();
        assert_eq!(encoder.categories("c"), Some(&["a".to_string()][..]));
        encoder.apply(&mut ds).unwrap();
        assert_eq!(ints(&ds, "c_a"), vec![Value::Int(1), Value::Int(0)]);
    }

    #[test]
    fn test_one_hot_name_collision() {
        let ds = Dataset::new(vec![
            Column::from_strs("color", ["red"]),
            Column::from_i64("color_red", [0]),
        ])
        .unwrap();
        let err = Encoder::one_hot()
            .with_columns(vec!["color".into()])
            .fit(&ds)
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidColumn { .. }));
    }

    #[test]
    fn test_one_hot_boolean_column() {
        let mut ds = Dataset::new(vec![Column::new(
            "flag",
            vec![Value::Bool(true), Value::Bool(false)],
        )])
        .unwrap();
        let mut encoder = Encoder::one_hot();
        encoder.fit(&ds).unwrap();
        encoder.apply(&mut ds).unwrap();
        assert_eq!(ds.column_names(), vec!["flag", "flag_true", "flag_false"]);
    }

    #[test]
    fn test_ordinal() {
        let mut ds = colors();
        let mut encoder = Encoder::ordinal();
        encoder.fit(&ds).unwrap();
        encoder.apply(&mut ds).unwrap();
        assert_eq!(
            ints(&ds, "color"),
            vec![Value::Int(0), Value::Int(1), Value::Int(0), Value::Int(2)]
        );
        assert_eq!(ds.n_columns(), 2);
    }

    #[test]
    fn test_ordinal_unseen_is_null() {
        let mut encoder = Encoder::ordinal();
        encoder.fit(&colors()).unwrap();
        let mut ds = Dataset::new(vec![Column::from_strs("color", ["blue", "purple"])]).unwrap();
        encoder.apply(&mut ds).unwrap();
        assert_eq!(ints(&ds, "color"), vec![Value::Int(1), Value::Null]);
    }

    #[test]
    fn test_ordinal_unseen_category_error_policy() {
        let mut encoder = Encoder::ordinal().with_handle_unknown(HandleUnknown::Error);
        encoder.fit(&colors()).unwrap();
        let mut ds = Dataset::new(vec![Column::from_strs("color", ["blue", "purple"])]).unwrap();
        match encoder.apply(&mut ds).unwrap_err() {
            TransformError::InvalidColumn { column, reason, .. } => {
                assert_eq!(column, "color");
                assert!(reason.contains("'purple'"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(ints(&ds, "color"), vec![Value::from("blue"), Value::from("purple")]);
    }

    #[test]
    fn test_one_hot_collision_leaves_dataset_untouched() {
        let mut encoder = Encoder::one_hot().with_columns(vec!["color".into(), "shape".into()]);
        let train = Dataset::new(vec![
            Column::from_strs("color", ["red"]),
            Column::from_strs("shape", ["round"]),
        ])
        .unwrap();
        encoder.fit(&train).unwrap();

        let mut ds = Dataset::new(vec![
            Column::from_strs("color", ["red"]),
            Column::from_strs("shape", ["round"]),
            Column::from_i64("shape_round", [7]),
        ])
        .unwrap();
        let before = ds.clone();
        let err = encoder.apply(&mut ds).unwrap_err();
        assert!(matches!(err, TransformError::InvalidColumn { column, .. } if column == "shape_round"));
        assert_eq!(ds, before);
    }

    #[test]
    fn test_apply_before_fit() {
        let mut ds = colors();
        assert!(matches!(
            Encoder::one_hot().apply(&mut ds).unwrap_err(),
            TransformError::Unfitted { .. }
        ));
    }

    #[test]
    fn test_missing_column() {
        let err = Encoder::ordinal()
            .with_columns(vec!["shape".into()])
            .fit(&colors())
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidColumn { column, .. } if column == "shape"));
    }
}
