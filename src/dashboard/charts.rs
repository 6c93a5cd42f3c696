//! Chart generation and rendering for the dashboard.
//!
//! Charts are built with `charming` and rendered as ECharts options that are
//! initialised by a script in the page head.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Emphasis, EmphasisFocus, ItemStyle,
        JsFunction, Tooltip, Trigger,
    },
    series::{Pie, bar::Bar},
};
use maud::{Markup, PreEscaped, html};

use crate::{html::HeadElement, month::BudgetMonth, transaction::Summary};

/// The ECharts build loaded on pages with charts.
pub(super) const ECHARTS_URL: &str = "https://cdn.jsdelivr.net/npm/echarts@6.0.0/dist/echarts.min.js";

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// A pie chart of this month's expenses in each category.
pub(super) fn expenses_by_category_chart(month: BudgetMonth, summary: &Summary) -> Chart {
    let data: Vec<(f64, String)> = summary
        .by_category
        .iter()
        .filter(|(_, totals)| totals.expense.is_positive())
        .map(|(category, totals)| (totals.expense.as_dollars(), category.to_string()))
        .collect();

    Chart::new()
        .title(
            Title::new()
                .text("Expenses by Category")
                .subtext(month.to_string()),
        )
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom("2%"))
        .series(
            Pie::new()
                .name("Expenses")
                .radius(vec!["40%", "70%"])
                .item_style(ItemStyle::new().border_radius(4))
                .data(data),
        )
}

/// Income and expenses side by side for each month.
pub(super) fn income_and_expenses_chart(monthly: &[(BudgetMonth, Summary)]) -> Chart {
    let labels: Vec<String> = monthly.iter().map(|(month, _)| month.to_string()).collect();
    let income: Vec<f64> = monthly
        .iter()
        .map(|(_, summary)| summary.income.as_dollars())
        .collect();
    let expenses: Vec<f64> = monthly
        .iter()
        .map(|(_, summary)| summary.expense.as_dollars())
        .collect();

    Chart::new()
        .title(
            Title::new()
                .text("Income vs Expenses")
                .subtext(format!("Last {} months", monthly.len())),
        )
        .tooltip(currency_tooltip())
        .legend(Legend::new().top("2%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(80)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Bar::new()
                .name("Income")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .item_style(ItemStyle::new().color("#16a34a"))
                .data(income),
        )
        .series(
            Bar::new()
                .name("Expenses")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .item_style(ItemStyle::new().color("#dc2626"))
                .data(expenses),
        )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use time::Month;

    use crate::{
        money::Money,
        month::BudgetMonth,
        transaction::{CategoryName, CategoryTotals, Summary},
    };

    use super::{expenses_by_category_chart, income_and_expenses_chart};

    fn summary(categories: &[(&str, i64, i64)]) -> Summary {
        let by_category: BTreeMap<_, _> = categories
            .iter()
            .map(|&(name, income, expense)| {
                (
                    CategoryName::new_unchecked(name),
                    CategoryTotals {
                        income: Money::new(income),
                        expense: Money::new(expense),
                    },
                )
            })
            .collect();

        Summary {
            income: by_category.values().map(|totals| totals.income).sum(),
            expense: by_category.values().map(|totals| totals.expense).sum(),
            by_category,
            ..Default::default()
        }
    }

    #[test]
    fn pie_chart_has_only_categories_with_expenses() {
        let month = BudgetMonth::new(2025, Month::October);
        let summary = summary(&[("Food", 0, 12_345), ("Salary", 500_000, 0), ("Rent", 0, 90_000)]);

        let options = expenses_by_category_chart(month, &summary).to_string();

        assert!(options.contains("\"Food\""), "{options}");
        assert!(options.contains("123.45"), "{options}");
        assert!(options.contains("\"Rent\""), "{options}");
        assert!(!options.contains("\"Salary\""), "{options}");
    }

    #[test]
    fn bar_chart_has_one_label_per_month() {
        let monthly = vec![
            (BudgetMonth::new(2025, Month::September), summary(&[("Food", 0, 100)])),
            (BudgetMonth::new(2025, Month::October), summary(&[("Pay", 200, 0)])),
        ];

        let options = income_and_expenses_chart(&monthly).to_string();

        assert!(options.contains("\"2025-09\""), "{options}");
        assert!(options.contains("\"2025-10\""), "{options}");
        assert!(options.contains("\"Income\""), "{options}");
        assert!(options.contains("\"Expenses\""), "{options}");
    }
}
