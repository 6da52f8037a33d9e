//! Built-in content: a handful of bank problems and the fixed fallback problem.

use crate::domain::{Difficulty, Problem, ProblemSource, Skill};

/// Minimal set of built-in problems that keep every skill practicable
/// without external config or OpenAI.
pub fn seed_problems() -> Vec<(Skill, Difficulty, Problem)> {
  vec![
    (
      Skill::FractionsDecimals,
      Difficulty::new(1),
      bank_problem(
        "Write 3/4 as a decimal.",
        "fraction_decimal_conversion",
        "0.75",
        "Divide the numerator by the denominator.",
        "Writing 3.4 by reading the fraction bar as a decimal point.",
      ),
    ),
    (
      Skill::FractionsDecimals,
      Difficulty::new(3),
      bank_problem(
        "What is 2/3 + 1/6?",
        "fraction_operations",
        "5/6",
        "Rewrite both fractions with the common denominator 6 before adding.",
        "Adding numerators and denominators directly to get 3/9.",
      ),
    ),
    (
      Skill::Algebra,
      Difficulty::new(1),
      bank_problem(
        "Solve for x: x + 7 = 12",
        "basic_equations",
        "x = 5",
        "Subtract 7 from both sides to isolate x.",
        "Adding 7 to 12 instead of subtracting it.",
      ),
    ),
    (
      Skill::Algebra,
      Difficulty::new(2),
      bank_problem(
        "If 3x + 5 = 14, what is the value of x?",
        "basic_equations",
        "x = 3",
        "To find x, first try to isolate the term with 'x' by subtracting 5 from both sides of the equation.",
        "Forgetting to perform the same operation on both sides of the equation.",
      ),
    ),
    (
      Skill::Geometry,
      Difficulty::new(2),
      bank_problem(
        "The point (2, 3) is translated 4 units right and 1 unit down. What are its new coordinates?",
        "translations",
        "(6, 2)",
        "Add to the x-coordinate for moves right and subtract from the y-coordinate for moves down.",
        "Applying the horizontal shift to the y-coordinate.",
      ),
    ),
  ]
}

fn bank_problem(statement: &str, kind: &str, answer: &str, hint: &str, mistake: &str) -> Problem {
  Problem {
    statement: statement.into(),
    problem_type: kind.into(),
    expected_answer: answer.into(),
    hint: hint.into(),
    common_mistake: mistake.into(),
    source: ProblemSource::Bank,
  }
}

/// Absolute last resort when the generator fails.
/// Deliberately the same geometry problem for every skill.
pub fn fallback_problem() -> Problem {
  Problem {
    statement: "A rectangle has a length of 12 units and a width of 5 units. What is its area?".into(),
    problem_type: "geometry_area".into(),
    expected_answer: "60".into(),
    hint: "The area of a rectangle is calculated by multiplying its length by its width.".into(),
    common_mistake: "A common mistake is adding the length and width instead of multiplying them.".into(),
    source: ProblemSource::Fallback,
  }
}
