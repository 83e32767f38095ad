fn main() -> std::process::ExitCode {
    branch_sales_lib::run()
}
