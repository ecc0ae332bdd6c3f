//! Bound dataset and parameters.

use crate::error::{ExpressionError, ExpressionResult};
use crate::expression::{Expression, Operand, Token};
use crate::props::{Binding, PropValue, Props};
use serde::{Deserialize, Serialize};

/// A named column of numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowVariable {
    pub name: String,
    pub values: Vec<f64>,
}

impl RowVariable {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Tabular data that loops iterate over, one row per iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub variables: Vec<RowVariable>,
    /// Row used by bindings outside of loops.
    pub active_row: usize,
}

impl Default for DataSet {
    fn default() -> Self {
        Self {
            variables: vec![RowVariable::new("items", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])],
            active_row: 0,
        }
    }
}

impl DataSet {
    pub fn new(variables: Vec<RowVariable>) -> Self {
        Self {
            variables,
            active_row: 0,
        }
    }

    /// Number of rows, taken from the first column.
    pub fn item_count(&self) -> usize {
        self.variables.first().map_or(0, |v| v.values.len())
    }

    pub fn variable(&self, index: usize) -> Option<&RowVariable> {
        self.variables.get(index)
    }

    pub fn value(&self, variable: usize, row: usize) -> Option<f64> {
        self.variables.get(variable)?.values.get(row).copied()
    }

    /// Set the active row. Out-of-range rows are ignored.
    pub fn set_active_row(&mut self, row: usize) -> bool {
        if row >= self.item_count() {
            return false;
        }
        self.active_row = row;
        true
    }
}

/// A named parameter. Its value may refer to other parameters and to row
/// variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: Expression,
}

/// Indexed list of parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.0.get(index)
    }

    /// Set a parameter, growing the list with zeroed entries if needed.
    pub fn set(&mut self, index: usize, name: impl Into<String>, value: impl Into<Expression>) {
        while self.0.len() <= index {
            let n = self.0.len();
            self.0.push(Parameter {
                name: format!("p{}", n),
                value: Expression::number(0.0),
            });
        }
        self.0[index] = Parameter {
            name: name.into(),
            value: value.into(),
        };
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter()
    }
}

/// Read-only view used to resolve bound props.
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    pub data: &'a DataSet,
    pub params: &'a Parameters,
}

impl<'a> Bindings<'a> {
    pub fn new(data: &'a DataSet, params: &'a Parameters) -> Self {
        Self { data, params }
    }

    /// Value of a binding. Row variables read the loop iteration's row, or
    /// the active row outside loops. Parameters are evaluated recursively.
    pub fn resolve(&self, binding: &Binding, iteration: Option<usize>) -> ExpressionResult<f64> {
        let mut visiting = Vec::new();
        match binding {
            Binding::Parameter(index) => self.parameter(*index, iteration, &mut visiting),
            Binding::RowVariable(index) => self.row_value(*index, iteration),
            Binding::Expression(expression) => self.evaluate_with(expression, iteration, &mut visiting),
        }
    }

    pub fn evaluate(&self, expression: &Expression, iteration: Option<usize>) -> ExpressionResult<f64> {
        self.evaluate_with(expression, iteration, &mut Vec::new())
    }

    fn evaluate_with(
        &self,
        expression: &Expression,
        iteration: Option<usize>,
        visiting: &mut Vec<usize>,
    ) -> ExpressionResult<f64> {
        expression.evaluate(|operand| match operand {
            Operand::Parameter(index) => self.parameter(index, iteration, visiting),
            Operand::RowVariable(index) => self.row_value(index, iteration),
        })
    }

    /// `visiting` holds the parameters currently being expanded.
    fn parameter(&self, index: usize, iteration: Option<usize>, visiting: &mut Vec<usize>) -> ExpressionResult<f64> {
        if visiting.contains(&index) {
            return Err(ExpressionError::CyclicParameter(index));
        }
        let parameter = self.params.get(index).ok_or(ExpressionError::UnknownParameter(index))?;
        visiting.push(index);
        let value = self.evaluate_with(&parameter.value, iteration, visiting);
        visiting.pop();
        value
    }

    fn row_value(&self, variable: usize, iteration: Option<usize>) -> ExpressionResult<f64> {
        let row = iteration.unwrap_or(self.data.active_row);
        self.data
            .value(variable, row)
            .ok_or(ExpressionError::MissingValue { variable, row })
    }

    /// Display form of a binding, using parameter and row variable names.
    pub fn label(&self, binding: &Binding) -> String {
        match binding {
            Binding::Parameter(index) => self.parameter_name(*index),
            Binding::RowVariable(index) => self.variable_name(*index),
            Binding::Expression(expression) => self.expression_label(expression),
        }
    }

    pub fn expression_label(&self, expression: &Expression) -> String {
        let parts: Vec<String> = expression
            .tokens()
            .iter()
            .map(|token| match token {
                Token::Number(n) => n.to_string(),
                Token::Parameter(index) => self.parameter_name(*index),
                Token::RowVariable(index) => self.variable_name(*index),
                Token::Operator(op) => op.symbol().to_string(),
                Token::Open => "(".to_string(),
                Token::Close => ")".to_string(),
            })
            .collect();
        parts.join(" ")
    }

    fn parameter_name(&self, index: usize) -> String {
        self.params
            .get(index)
            .map_or_else(|| format!("p{}", index), |p| p.name.clone())
    }

    fn variable_name(&self, index: usize) -> String {
        self.data
            .variable(index)
            .map_or_else(|| format!("column {}", index), |v| v.name.clone())
    }

    /// Replace bound values with numbers. Bindings that cannot be resolved
    /// are dropped so the shape's default applies.
    pub fn resolve_props(&self, props: &Props, iteration: Option<usize>) -> Props {
        props
            .iter()
            .filter_map(|(key, value)| match value {
                PropValue::Bound(binding) => match self.resolve(binding, iteration) {
                    Ok(n) => Some((key.clone(), PropValue::Number(n))),
                    Err(err) => {
                        log::warn!("Dropping binding on {}: {}", key, err);
                        None
                    }
                },
                other => Some((key.clone(), other.clone())),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dataset() {
        let data = DataSet::default();
        assert_eq!(data.item_count(), 6);
        assert_eq!(data.value(0, 2), Some(3.0));
        assert_eq!(DataSet::new(Vec::new()).item_count(), 0);
    }

    #[test]
    fn test_active_row_bounds() {
        let mut data = DataSet::default();
        assert!(data.set_active_row(5));
        assert!(!data.set_active_row(6));
        assert_eq!(data.active_row, 5);
    }

    #[test]
    fn test_parameters_grow() {
        let mut params = Parameters::new();
        params.set(2, "size", 40.0);
        assert_eq!(params.len(), 3);
        assert_eq!(params.get(0).unwrap().value.as_number(), Some(0.0));
        assert_eq!(params.get(2).unwrap().name, "size");
    }

    #[test]
    fn test_row_variable_uses_iteration() {
        let mut data = DataSet::new(vec![RowVariable::new("w", vec![10.0, 20.0, 30.0])]);
        data.set_active_row(1);
        let params = Parameters::new();
        let bindings = Bindings::new(&data, &params);
        assert_eq!(bindings.resolve(&Binding::RowVariable(0), Some(2)), Ok(30.0));
        assert_eq!(bindings.resolve(&Binding::RowVariable(0), None), Ok(20.0));
        assert_eq!(
            bindings.resolve(&Binding::RowVariable(0), Some(3)),
            Err(ExpressionError::MissingValue { variable: 0, row: 3 })
        );
    }

    #[test]
    fn test_resolve_props_drops_unresolvable() {
        let data = DataSet::default();
        let mut params = Parameters::new();
        params.set(0, "w", 42.0);
        let bindings = Bindings::new(&data, &params);
        let props = Props::new()
            .with("width", Binding::Parameter(0))
            .with("height", Binding::Parameter(7))
            .with("x", 3.0);
        let resolved = bindings.resolve_props(&props, None);
        assert_eq!(resolved.number("width"), Some(42.0));
        assert!(resolved.get("height").is_none());
        assert_eq!(resolved.number("x"), Some(3.0));
    }

    fn tokens(tokens: &[Token]) -> Expression {
        Expression::new(tokens.to_vec())
    }

    #[test]
    fn test_composite_expression() {
        use crate::expression::Operator::{Add, Mul};
        let data = DataSet::new(vec![RowVariable::new("w", vec![10.0, 20.0, 30.0])]);
        let mut params = Parameters::new();
        params.set(0, "margin", 5.0);
        let bindings = Bindings::new(&data, &params);
        // ( w + margin ) * 2
        let binding = Binding::Expression(tokens(&[
            Token::Open,
            Token::RowVariable(0),
            Token::Operator(Add),
            Token::Parameter(0),
            Token::Close,
            Token::Operator(Mul),
            Token::Number(2.0),
        ]));
        assert_eq!(bindings.resolve(&binding, Some(1)), Ok(50.0));
        assert_eq!(bindings.resolve(&binding, None), Ok(30.0));
        assert_eq!(bindings.label(&binding), "( w + margin ) * 2");
    }

    #[test]
    fn test_parameter_defined_by_expression() {
        use crate::expression::Operator::{Div, Sub};
        let data = DataSet::default();
        let mut params = Parameters::new();
        params.set(0, "size", 40.0);
        params.set(1, "half", tokens(&[Token::Parameter(0), Token::Operator(Div), Token::Number(2.0)]));
        params.set(2, "inset", tokens(&[Token::Parameter(1), Token::Operator(Sub), Token::RowVariable(0)]));
        let bindings = Bindings::new(&data, &params);
        assert_eq!(bindings.resolve(&Binding::Parameter(1), None), Ok(20.0));
        // Row 4 of the default dataset holds 5.
        assert_eq!(bindings.resolve(&Binding::Parameter(2), Some(4)), Ok(15.0));
        assert_eq!(bindings.label(&Binding::Parameter(2)), "inset");
    }

    #[test]
    fn test_parameter_cycle_rejected() {
        use crate::expression::Operator::Add;
        let data = DataSet::default();
        let mut params = Parameters::new();
        params.set(0, "a", tokens(&[Token::Parameter(1), Token::Operator(Add), Token::Number(1.0)]));
        params.set(1, "b", tokens(&[Token::Parameter(0)]));
        params.set(2, "c", tokens(&[Token::Parameter(2)]));
        let bindings = Bindings::new(&data, &params);
        assert_eq!(bindings.resolve(&Binding::Parameter(0), None), Err(ExpressionError::CyclicParameter(0)));
        assert_eq!(bindings.resolve(&Binding::Parameter(2), None), Err(ExpressionError::CyclicParameter(2)));
        // The same parameter twice in one expression is not a cycle.
        let twice = Binding::Expression(tokens(&[Token::Parameter(1), Token::Operator(Add), Token::Parameter(1)]));
        params.set(1, "b", 3.0);
        let bindings = Bindings::new(&data, &params);
        assert_eq!(bindings.resolve(&twice, None), Ok(6.0));
    }
}
