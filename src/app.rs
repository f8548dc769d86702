use chrono::Utc;
use color_eyre::Result;
use eyre::{
    bail,
    eyre,
    Context as _,
};
use nifi_usage_config::{
    Command,
    Config,
    CountStrategy,
};
use nifi_usage_gatherer::{
    display,
    export,
    BatchReport,
    CountRetriever,
    Credentials,
    GroupReport,
    GroupTarget,
    ProcessorEnumerator,
    ProvenanceCounter,
    ProvenanceOptions,
    Session,
    SessionOptions,
    StatusCounter,
    TimeWindow,
    UsageOrchestrator,
};
use std::{
    fs::{
        self,
        File,
    },
    io::{
        self,
        BufWriter,
        Write as _,
    },
    path::{
        Path,
        PathBuf,
    },
    process::ExitCode,
};

pub struct App {
    config: Config,
    command: Command,
}

impl App {
    pub fn new(config: Config, command: Option<Command>) -> Self {
        Self {
            config,
            command: command.unwrap_or(Command::Analyze),
        }
    }

    pub async fn run(self) -> Result<ExitCode> {
        let session = self.open_session().await?;
        match &self.command {
            Command::Analyze if self.config.is_batch() => self.analyze_batch(&session).await,
            Command::Analyze => self.analyze_single(&session).await,
            Command::ListGroups { group_id, output } => self.list_groups(&session, group_id, output.as_deref()).await,
        }
    }

    async fn open_session(&self) -> Result<Session> {
        let url = self
            .config
            .nifi_url
            .as_deref()
            .ok_or_else(|| eyre!("nifi_url is not configured"))?;
        let username = self.config.username.as_deref().unwrap_or_default();
        let password = self.config.password.as_ref().map(|p| p.expose()).unwrap_or_default();
        let options = SessionOptions {
            verify_tls: self.config.verify_ssl,
            timeout: self.config.request_timeout,
        };
        if !options.verify_tls {
            warn!("TLS certificate verification is disabled");
        }

        let session = Session::open(url, &Credentials::new(username, password), &options)
            .await
            .wrap_err("Could not open a session")?;
        Ok(session)
    }

    fn retriever(&self) -> Box<dyn CountRetriever> {
        match self.config.strategy {
            CountStrategy::Status => Box::new(StatusCounter::new()),
            CountStrategy::Provenance => {
                let window = TimeWindow::last_days(Utc::now(), self.config.days_back);
                Box::new(ProvenanceCounter::new(ProvenanceOptions {
                    window,
                    max_results: self.config.max_results,
                    poll_interval: self.config.poll_interval,
                    query_timeout: self.config.query_timeout,
                    concurrency: self.config.concurrency,
                }))
            }
        }
    }

    async fn analyze_single(&self, session: &Session) -> Result<ExitCode> {
        let retriever = self.retriever();
        let target = GroupTarget::unlabeled(&self.config.process_group_id);
        info!(group_id = %target.id, strategy = retriever.name(), "Analyzing process group");

        let report = UsageOrchestrator::new(session, retriever.as_ref())
            .analyze_group(&target)
            .await
            .wrap_err_with(|| format!("Failed to analyze process group {}", target.id))?;

        println!("{}", display::format_report(&report));

        let dir = self.output_dir()?;
        let csv_path = export::report_path(&dir, &self.config.output_prefix);
        let chart_path = export::chart_path(&dir, &self.config.output_prefix);
        write_report_files(&report, &csv_path, &chart_path)?;
        info!(csv = %csv_path.display(), chart = %chart_path.display(), "Report written");

        Ok(ExitCode::SUCCESS)
    }

    async fn analyze_batch(&self, session: &Session) -> Result<ExitCode> {
        let flows = self.config.flows()?;
        if flows.is_empty() {
            bail!("Batch mode is configured but the flow list is empty");
        }
        let targets: Vec<GroupTarget> = flows
            .iter()
            .map(|flow| GroupTarget::new(&flow.id, &flow.flow_name))
            .collect();

        let retriever = self.retriever();
        info!(flows = targets.len(), strategy = retriever.name(), "Analyzing flows");

        let batch = UsageOrchestrator::new(session, retriever.as_ref())
            .run_batch(&targets)
            .await
            .wrap_err("Batch run aborted")?;

        let dir = self.output_dir()?;
        self.write_batch_files(&batch, &dir)?;

        for (_, report) in batch.reports() {
            println!("{}", display::format_summary_table(report));
        }
        println!("{}", display::format_run_summary(&batch));

        let summary = batch.summary();
        if summary.all_failed() {
            error!(failed = summary.failed, "Every flow failed");
            return Ok(ExitCode::FAILURE);
        }
        Ok(ExitCode::SUCCESS)
    }

    fn write_batch_files(&self, batch: &BatchReport, dir: &Path) -> Result<()> {
        let prefix = &self.config.output_prefix;
        for (target, report) in batch.reports() {
            let csv_path = export::flow_report_path(dir, prefix, &target.label);
            let chart_path = export::flow_chart_path(dir, prefix, &target.label);
            write_report_files(report, &csv_path, &chart_path)?;
            debug!(flow = %target.label, csv = %csv_path.display(), "Flow report written");
        }

        let combined = export::combined_path(dir, prefix, batch.snapshot);
        let rows = batch.rows();
        let file = File::create(&combined).wrap_err_with(|| format!("Failed to create {:?}", combined))?;
        export::write_batch_csv(BufWriter::new(file), &rows)?;
        info!(path = %combined.display(), rows = rows.len(), "Combined batch file written");
        Ok(())
    }

    async fn list_groups(&self, session: &Session, group_id: &str, output: Option<&Path>) -> Result<ExitCode> {
        let groups = ProcessorEnumerator::new(session)
            .list_child_groups(group_id)
            .await
            .wrap_err_with(|| format!("Failed to list the child groups of {group_id}"))?;
        info!(parent = group_id, count = groups.len(), "Found process groups");

        match output {
            Some(path) => {
                let file = File::create(path).wrap_err_with(|| format!("Failed to create {:?}", path))?;
                export::write_flows_csv(BufWriter::new(file), &groups)?;
                info!(path = %path.display(), "Flows file written");
            }
            None => {
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                export::write_flows_csv(&mut lock, &groups)?;
                lock.flush()?;
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    fn output_dir(&self) -> Result<PathBuf> {
        let dir = self.config.output_dir.clone();
        fs::create_dir_all(&dir).wrap_err_with(|| format!("Failed to create output directory {:?}", dir))?;
        Ok(dir)
    }
}

fn write_report_files(report: &GroupReport, csv_path: &Path, chart_path: &Path) -> Result<()> {
    let file = File::create(csv_path).wrap_err_with(|| format!("Failed to create {:?}", csv_path))?;
    export::write_report_csv(BufWriter::new(file), report)?;

    let file = File::create(chart_path).wrap_err_with(|| format!("Failed to create {:?}", chart_path))?;
    export::write_chart_json(BufWriter::new(file), &report.chart_series())?;
    Ok(())
}
