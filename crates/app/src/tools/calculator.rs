use mcp_scaffold::{text_result, McpError, Server, ToolResult, TypedToolHandler};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    fn symbol(self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "*",
            Operation::Divide => "/",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalculatorArgs {
    operation: Operation,
    a: f64,
    b: f64,
}

pub fn register(srv: &mut Server) {
    srv.handle_tool(
        "calculator",
        TypedToolHandler::new(|args: CalculatorArgs| async move { handle_calculator(args) }),
    );
}

fn handle_calculator(args: CalculatorArgs) -> Result<ToolResult, McpError> {
    let CalculatorArgs { operation, a, b } = args;
    let result = match operation {
        Operation::Add => a + b,
        Operation::Subtract => a - b,
        Operation::Multiply => a * b,
        Operation::Divide => {
            if b == 0.0 {
                return Err(McpError::ToolError("division by zero".into()));
            }
            a / b
        }
    };
    if !result.is_finite() {
        return Err(McpError::ToolError("result is not a finite number".into()));
    }
    Ok(text_result(format!("{} {} {} = {}", a, operation.symbol(), b, result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(operation: Operation, a: f64, b: f64) -> Result<ToolResult, McpError> {
        handle_calculator(CalculatorArgs { operation, a, b })
    }

    #[test]
    fn test_operations() {
        assert_eq!(calc(Operation::Add, 2.0, 3.0).unwrap().first_text(), Some("2 + 3 = 5"));
        assert_eq!(calc(Operation::Subtract, 2.0, 3.0).unwrap().first_text(), Some("2 - 3 = -1"));
        assert_eq!(calc(Operation::Multiply, 1.5, 4.0).unwrap().first_text(), Some("1.5 * 4 = 6"));
        assert_eq!(calc(Operation::Divide, 7.0, 2.0).unwrap().first_text(), Some("7 / 2 = 3.5"));
    }

    #[test]
    fn test_divide_by_zero() {
        let err = calc(Operation::Divide, 1.0, 0.0).unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(calc(Operation::Multiply, f64::MAX, 2.0).is_err());
    }
}
