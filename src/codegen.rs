//! Code generation: lower the program IR into Morpho assembly.
//!
//! The emitter follows a strict accumulator discipline: every expression
//! may clobber the accumulator on entry and leaves its own value there on
//! exit. Intermediate operands go through `(Push)` and are consumed by
//! arity-qualified calls, so binary operators are ordinary two-argument
//! calls rather than dedicated instructions.

use crate::parser::{Body, Expr, Function, Program, SmallExpr};

/// Emit Morpho assembly for a whole program, one instruction per line.
/// `name` becomes the executable name in the preamble.
pub fn generate(name: &str, program: &Program) -> Vec<String> {
  let mut generator = Generator::new();
  generator.program(name, program);
  generator.lines
}

/// The append-only instruction log plus the label counter. One generator
/// is built per compilation, so labels are unique across the whole run.
struct Generator {
  lines: Vec<String>,
  next_label: u32,
}

impl Generator {
  fn new() -> Self {
    Self {
      lines: Vec::new(),
      next_label: 1,
    }
  }

  fn new_label(&mut self) -> u32 {
    let label = self.next_label;
    self.next_label += 1;
    label
  }

  fn emit(&mut self, line: impl Into<String>) {
    self.lines.push(line.into());
  }

  fn program(&mut self, name: &str, program: &Program) {
    self.emit(format!("\"{name}.mexe\" = main in"));
    self.emit("!{{");
    for function in &program.functions {
      self.function(function);
    }
    self.emit("}}*BASIS;");
  }

  fn function(&mut self, function: &Function) {
    self.emit(format!("#\"{}[f{}]\" =", function.name, function.arg_count));
    self.emit("[");
    // Make room for the locals; the last created slot value is left in the
    // accumulator, consistent with the expression contract.
    if function.var_count > 0 {
      self.emit("(MakeVal null)");
      for _ in 1..function.var_count {
        self.emit("(MakeValP null)");
      }
      self.emit("(Push)");
    }
    for expr in &function.body {
      self.expression(expr);
    }
    // every function returns, whether the source said so or not
    if self.lines.last().map(String::as_str) != Some("(Return)") {
      self.emit("(Return)");
    }
    self.emit("];");
  }

  fn expression(&mut self, expr: &Expr) {
    self.small_expression(&expr.first);
    for (op, operand) in &expr.rest {
      self.emit("(Push)");
      self.small_expression(operand);
      self.emit(format!("(Call #\"{op}[f2]\" 2)"));
    }
  }

  fn small_expression(&mut self, small: &SmallExpr) {
    match small {
      SmallExpr::Name { slot } => {
        self.emit(format!("(Fetch {slot})"));
      }
      SmallExpr::Assign { slot, value } => {
        self.expression(value);
        self.emit(format!("(Store {slot})"));
      }
      SmallExpr::Call { name, args } => {
        if let Some((first, rest)) = args.split_first() {
          self.expression(first);
          for arg in rest {
            self.emit("(Push)");
            self.expression(arg);
          }
        }
        let arity = args.len();
        self.emit(format!("(Call #\"{name}[f{arity}]\" {arity})"));
      }
      SmallExpr::Return { value } => {
        self.expression(value);
        self.emit("(Return)");
      }
      SmallExpr::Unary { op, operand } => {
        self.small_expression(operand);
        self.emit(format!("(Call #\"{op}[f1]\" 1)"));
      }
      SmallExpr::Literal { text } => {
        self.emit(format!("(MakeVal {text})"));
      }
      SmallExpr::If {
        cond,
        then_body,
        elifs,
        else_body,
      } => {
        let label = self.new_label();
        self.expression(cond);
        self.emit(format!("(GoFalse _{label})"));
        self.body(then_body);
        self.emit(format!("_{label}:"));
        for (elif_cond, elif_body) in elifs {
          let label = self.new_label();
          self.expression(elif_cond);
          self.emit(format!("(GoFalse _{label})"));
          self.body(elif_body);
          self.emit(format!("_{label}:"));
        }
        // the else body sits on the fall-through path of the last arm
        if let Some(else_body) = else_body {
          self.body(else_body);
        }
      }
      SmallExpr::While { cond, body } => {
        let top = self.new_label();
        let exit = self.new_label();
        self.emit(format!("_{top}:"));
        self.expression(cond);
        self.emit(format!("(GoFalse _{exit})"));
        self.body(body);
        self.emit(format!("(Go _{top})"));
        self.emit(format!("_{exit}:"));
      }
      SmallExpr::Priority { inner } => {
        self.expression(inner);
      }
    }
  }

  /// Emit a body: the first expression directly, every further one behind
  /// a `(Push)`, leaving the last expression's value in the accumulator.
  fn body(&mut self, body: &Body) {
    for (i, expr) in body.iter().enumerate() {
      if i != 0 {
        self.emit("(Push)");
      }
      self.expression(expr);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn literal(text: &str) -> SmallExpr {
    SmallExpr::Literal {
      text: text.to_string(),
    }
  }

  fn single_function(function: Function) -> Program {
    Program {
      functions: vec![function],
    }
  }

  fn function_with_body(var_count: usize, body: Vec<Expr>) -> Function {
    Function {
      name: "f".to_string(),
      arg_count: 0,
      var_count,
      body,
    }
  }

  #[test]
  fn program_frame_is_preamble_functions_close_marker() {
    let program = single_function(function_with_body(0, vec![Expr::single(literal("1"))]));
    let lines = generate("prog", &program);
    assert_eq!(lines.first().map(String::as_str), Some("\"prog.mexe\" = main in"));
    assert_eq!(lines.get(1).map(String::as_str), Some("!{{"));
    assert_eq!(lines.last().map(String::as_str), Some("}}*BASIS;"));
  }

  #[test]
  fn header_carries_declared_arity() {
    let mut function = function_with_body(0, vec![Expr::single(literal("1"))]);
    function.arg_count = 3;
    let lines = generate("prog", &single_function(function));
    assert!(lines.contains(&"#\"f[f3]\" =".to_string()));
  }

  #[test]
  fn frame_init_creates_one_slot_per_local() {
    let function = function_with_body(3, vec![Expr::single(literal("1"))]);
    let lines = generate("prog", &single_function(function));
    assert_eq!(
      &lines[4..8],
      &[
        "(MakeVal null)".to_string(),
        "(MakeValP null)".to_string(),
        "(MakeValP null)".to_string(),
        "(Push)".to_string(),
      ]
    );
  }

  #[test]
  fn no_frame_init_without_locals() {
    let function = function_with_body(0, vec![Expr::single(literal("1"))]);
    let lines = generate("prog", &single_function(function));
    assert!(!lines.iter().any(|line| line.contains("MakeVal null")));
  }

  #[test]
  fn missing_return_is_appended_exactly_once() {
    let function = function_with_body(0, vec![Expr::single(literal("1"))]);
    let lines = generate("prog", &single_function(function));
    assert_eq!(
      &lines[4..7],
      &[
        "(MakeVal 1)".to_string(),
        "(Return)".to_string(),
        "];".to_string(),
      ]
    );
  }

  #[test]
  fn explicit_trailing_return_is_not_doubled() {
    let function = function_with_body(
      0,
      vec![Expr::single(SmallExpr::Return {
        value: Box::new(Expr::single(literal("1"))),
      })],
    );
    let lines = generate("prog", &single_function(function));
    let returns = lines.iter().filter(|line| *line == "(Return)").count();
    assert_eq!(returns, 1);
  }

  #[test]
  fn operator_chain_lowers_to_push_and_arity_two_calls() {
    let function = function_with_body(
      0,
      vec![Expr::chain(
        literal("1"),
        vec![
          ("+".to_string(), literal("2")),
          ("*".to_string(), literal("3")),
        ],
      )],
    );
    let lines = generate("prog", &single_function(function));
    assert_eq!(
      &lines[4..11],
      &[
        "(MakeVal 1)".to_string(),
        "(Push)".to_string(),
        "(MakeVal 2)".to_string(),
        "(Call #\"+[f2]\" 2)".to_string(),
        "(Push)".to_string(),
        "(MakeVal 3)".to_string(),
        "(Call #\"*[f2]\" 2)".to_string(),
      ]
    );
  }

  #[test]
  fn zero_argument_call_pushes_nothing() {
    let function = function_with_body(
      0,
      vec![Expr::single(SmallExpr::Call {
        name: "g".to_string(),
        args: vec![],
      })],
    );
    let lines = generate("prog", &single_function(function));
    assert_eq!(lines[4], "(Call #\"g[f0]\" 0)");
    assert!(!lines.contains(&"(Push)".to_string()));
  }

  #[test]
  fn call_arguments_interleave_pushes() {
    let function = function_with_body(
      0,
      vec![Expr::single(SmallExpr::Call {
        name: "g".to_string(),
        args: vec![
          Expr::single(literal("1")),
          Expr::single(literal("2")),
          Expr::single(literal("3")),
        ],
      })],
    );
    let lines = generate("prog", &single_function(function));
    assert_eq!(
      &lines[4..10],
      &[
        "(MakeVal 1)".to_string(),
        "(Push)".to_string(),
        "(MakeVal 2)".to_string(),
        "(Push)".to_string(),
        "(MakeVal 3)".to_string(),
        "(Call #\"g[f3]\" 3)".to_string(),
      ]
    );
  }

  #[test]
  fn unary_is_an_arity_one_call() {
    let function = function_with_body(
      0,
      vec![Expr::single(SmallExpr::Unary {
        op: "-".to_string(),
        operand: Box::new(literal("1")),
      })],
    );
    let lines = generate("prog", &single_function(function));
    assert_eq!(lines[4], "(MakeVal 1)");
    assert_eq!(lines[5], "(Call #\"-[f1]\" 1)");
  }

  #[test]
  fn store_leaves_value_for_following_fetch() {
    let function = Function {
      name: "f".to_string(),
      arg_count: 0,
      var_count: 1,
      body: vec![
        Expr::single(SmallExpr::Assign {
          slot: 0,
          value: Box::new(Expr::single(literal("3"))),
        }),
        Expr::single(SmallExpr::Name { slot: 0 }),
      ],
    };
    let lines = generate("prog", &single_function(function));
    assert_eq!(
      &lines[4..9],
      &[
        "(MakeVal null)".to_string(),
        "(Push)".to_string(),
        "(MakeVal 3)".to_string(),
        "(Store 0)".to_string(),
        "(Fetch 0)".to_string(),
      ]
    );
  }

  #[test]
  fn priority_is_pure_pass_through() {
    let function = function_with_body(
      0,
      vec![Expr::single(SmallExpr::Priority {
        inner: Box::new(Expr::single(literal("1"))),
      })],
    );
    let lines = generate("prog", &single_function(function));
    assert_eq!(lines[4], "(MakeVal 1)");
  }

  #[test]
  fn if_chain_emits_one_branch_per_arm() {
    let arm_body = vec![Expr::single(literal("1"))];
    let function = function_with_body(
      0,
      vec![Expr::single(SmallExpr::If {
        cond: Box::new(Expr::single(literal("true"))),
        then_body: arm_body.clone(),
        elifs: vec![
          (Expr::single(literal("true")), arm_body.clone()),
          (Expr::single(literal("true")), arm_body.clone()),
        ],
        else_body: None,
      })],
    );
    let lines = generate("prog", &single_function(function));
    let branches: Vec<&String> = lines.iter().filter(|line| line.starts_with("(GoFalse")).collect();
    assert_eq!(branches.len(), 3);
    assert_eq!(branches[0].as_str(), "(GoFalse _1)");
    assert_eq!(branches[1].as_str(), "(GoFalse _2)");
    assert_eq!(branches[2].as_str(), "(GoFalse _3)");
    assert!(lines.contains(&"_3:".to_string()));
  }

  #[test]
  fn else_body_sits_after_last_arm_label() {
    let function = function_with_body(
      0,
      vec![Expr::single(SmallExpr::If {
        cond: Box::new(Expr::single(literal("true"))),
        then_body: vec![Expr::single(literal("1"))],
        elifs: vec![],
        else_body: Some(vec![Expr::single(literal("2"))]),
      })],
    );
    let lines = generate("prog", &single_function(function));
    assert_eq!(
      &lines[4..9],
      &[
        "(MakeVal true)".to_string(),
        "(GoFalse _1)".to_string(),
        "(MakeVal 1)".to_string(),
        "_1:".to_string(),
        "(MakeVal 2)".to_string(),
      ]
    );
  }

  #[test]
  fn while_loop_reevaluates_condition_each_round() {
    let function = Function {
      name: "f".to_string(),
      arg_count: 1,
      var_count: 0,
      body: vec![Expr::single(SmallExpr::While {
        cond: Box::new(Expr::single(SmallExpr::Name { slot: 0 })),
        body: vec![Expr::single(literal("1"))],
      })],
    };
    let lines = generate("prog", &single_function(function));
    assert_eq!(
      &lines[4..10],
      &[
        "_1:".to_string(),
        "(Fetch 0)".to_string(),
        "(GoFalse _2)".to_string(),
        "(MakeVal 1)".to_string(),
        "(Go _1)".to_string(),
        "_2:".to_string(),
      ]
    );
  }

  #[test]
  fn labels_increase_across_constructs_and_never_repeat() {
    let while_expr = |slot| {
      Expr::single(SmallExpr::While {
        cond: Box::new(Expr::single(SmallExpr::Name { slot })),
        body: vec![Expr::single(literal("1"))],
      })
    };
    let function = Function {
      name: "f".to_string(),
      arg_count: 1,
      var_count: 0,
      body: vec![while_expr(0), while_expr(0)],
    };
    let lines = generate("prog", &single_function(function));
    let labels: Vec<&String> = lines.iter().filter(|line| line.ends_with(':')).collect();
    assert_eq!(labels, vec!["_1:", "_2:", "_3:", "_4:"]);
  }

  #[test]
  fn body_separates_statements_with_push() {
    let function = function_with_body(
      0,
      vec![Expr::single(SmallExpr::If {
        cond: Box::new(Expr::single(literal("true"))),
        then_body: vec![Expr::single(literal("1")), Expr::single(literal("2"))],
        elifs: vec![],
        else_body: None,
      })],
    );
    let lines = generate("prog", &single_function(function));
    assert_eq!(
      &lines[6..9],
      &[
        "(MakeVal 1)".to_string(),
        "(Push)".to_string(),
        "(MakeVal 2)".to_string(),
      ]
    );
  }

  #[test]
  fn function_end_markers_match_function_count() {
    let program = Program {
      functions: vec![
        function_with_body(0, vec![Expr::single(literal("1"))]),
        function_with_body(0, vec![Expr::single(literal("2"))]),
      ],
    };
    let lines = generate("prog", &program);
    let ends = lines.iter().filter(|line| *line == "];").count();
    assert_eq!(ends, 2);
    // and each function's last instruction is a return
    for (i, line) in lines.iter().enumerate() {
      if line == "];" {
        assert_eq!(lines[i - 1], "(Return)");
      }
    }
  }
}
