mod support;

mod eligibility_tests;
mod monitor_tests;
