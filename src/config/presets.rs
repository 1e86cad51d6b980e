//! Built-in pipeline for the employee dataset
//!
//! Used by `tabclean run` when no configuration file is given.

use super::{CleanRuleConfig, InputConfig, PipelineConfig};
use crate::collab::{ChartKind, ChartSpec, ModelKind, ModelSpec};
use crate::pipeline::{Aggregation, CoerceTarget, DeriveRule, Reduction, ReductionKind, SortOrder};
use std::path::PathBuf;

/// Performance levels, lowest first
pub const PERFORMANCE_LEVELS: [&str; 3] = ["Low", "Medium", "High"];

/// Years of experience above which an employee counts as senior
pub const SENIORITY_THRESHOLD: f64 = 10.0;

/// The employee cleaning and aggregation pipeline
///
/// Salaries must be strictly positive. `Performance_Score` becomes an ordered
/// categorical; `Gender`, `Department` and `Remote_Work` become unordered
/// categoricals with levels in sorted order.
pub fn employee_pipeline(path: impl Into<PathBuf>) -> PipelineConfig {
    let coerce = |column: &str, target: CoerceTarget| CleanRuleConfig::Coerce {
        column: column.to_string(),
        target,
    };

    PipelineConfig {
        input: InputConfig {
            path: Some(path.into()),
            ..InputConfig::default()
        },
        clean: vec![
            CleanRuleConfig::Filter("Salary > 0".to_string()),
            coerce("Join_Date", CoerceTarget::date()),
            coerce("Performance_Score", CoerceTarget::ordered(PERFORMANCE_LEVELS)),
            coerce("Gender", CoerceTarget::categorical()),
            coerce("Department", CoerceTarget::categorical()),
            coerce("Remote_Work", CoerceTarget::categorical()),
        ],
        derive: vec![
            DeriveRule::Tenure {
                column: "Years_at_Company".to_string(),
                from: "Join_Date".to_string(),
            },
            DeriveRule::Bucket {
                column: "Experience_Level".to_string(),
                from: "Experience_Years".to_string(),
                threshold: SENIORITY_THRESHOLD,
                above: "Senior".to_string(),
                below: "Junior".to_string(),
            },
        ],
        aggregate: vec![
            Aggregation::new("salary_by_department", ["Department"])
                .reduce(Reduction::new("mean_salary", "Salary", ReductionKind::Mean))
                .reduce(Reduction::new("sd_salary", "Salary", ReductionKind::StdDev))
                .reduce(Reduction::count("employees"))
                .sort_by("mean_salary", SortOrder::Descending),
            Aggregation::new("gender_by_department", ["Department", "Gender"])
                .reduce(Reduction::count("employees"))
                .with_share("percentage")
                .order_keys(),
            Aggregation::new("performance_by_remote", ["Remote_Work", "Performance_Score"])
                .reduce(Reduction::count("employees"))
                .with_share("percentage")
                .order_keys(),
            Aggregation::new("satisfaction_by_level", ["Experience_Level"])
                .reduce(Reduction::new(
                    "mean_satisfaction",
                    "Satisfaction_Level",
                    ReductionKind::Mean,
                ))
                .reduce(Reduction::new(
                    "mean_projects",
                    "Projects_Completed",
                    ReductionKind::Mean,
                ))
                .reduce(Reduction::new("mean_tenure", "Years_at_Company", ReductionKind::Mean))
                .order_keys(),
        ],
        charts: vec![
            ChartSpec::new("salary_by_department_chart", ChartKind::Bar, "Department")
                .from_table("salary_by_department")
                .with_y("mean_salary")
                .with_title("Average salary by department"),
            ChartSpec::new("salary_distribution", ChartKind::Histogram, "Salary")
                .with_title("Salary distribution"),
            ChartSpec::new("salary_by_gender", ChartKind::Boxplot, "Gender")
                .with_y("Salary")
                .with_fill("Gender"),
            ChartSpec::new("experience_vs_salary", ChartKind::Scatter, "Experience_Years")
                .with_y("Salary")
                .with_fill("Department"),
            ChartSpec::new("gender_mix", ChartKind::Bar, "Department")
                .from_table("gender_by_department")
                .with_y("percentage")
                .with_fill("Gender"),
            ChartSpec::new("performance_share", ChartKind::Pie, "Performance_Score"),
        ],
        models: vec![
            ModelSpec::new("salary_by_gender", ModelKind::TTest, "Salary", ["Gender"]),
            ModelSpec::new("salary_by_department", ModelKind::Anova, "Salary", ["Department"]),
            ModelSpec::new(
                "performance_vs_remote",
                ModelKind::ChiSquare,
                "Performance_Score",
                ["Remote_Work"],
            ),
            ModelSpec::new(
                "salary_regression",
                ModelKind::Regression,
                "Salary",
                ["Experience_Years", "Age", "Years_at_Company"],
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_is_structurally_valid() {
        let config = employee_pipeline("employees.csv");
        config.validate().unwrap();
        assert_eq!(config.input.path, Some(PathBuf::from("employees.csv")));
        assert_eq!(config.to_pipeline().unwrap().clean_rules.len(), 6);
    }

    #[test]
    fn test_charts_read_declared_aggregates() {
        let config = employee_pipeline("employees.csv");
        for chart in config.charts.iter().filter(|c| c.table.is_some()) {
            let table = chart.table.as_deref().unwrap();
            assert!(config.aggregate.iter().any(|a| a.name == table), "{}", table);
        }
    }
}
