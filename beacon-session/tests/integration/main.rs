mod utils;

mod call_flow_tests;
mod negotiation_tests;
mod presence_tests;
