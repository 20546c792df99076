fn main() -> std::process::ExitCode {
    callcenter_kpi_lib::run()
}
