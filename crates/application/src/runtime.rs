//! Agent runtime: the two periodic jobs on one scheduler

use crate::service::{AgentService, KNOWLEDGE_JOB, POLLING_JOB};
use common::{JobId, ScheduledJob, Scheduler};
use domain::config::ScheduleConfig;
use std::sync::Arc;
use tracing::{error, info};

pub struct AgentRuntime {
    service: Arc<AgentService>,
    scheduler: Scheduler,
    schedule: ScheduleConfig,
}

impl AgentRuntime {
    pub fn new(service: Arc<AgentService>, schedule: ScheduleConfig) -> Self {
        Self {
            scheduler: Scheduler::new(schedule.shutdown_grace()),
            service,
            schedule,
        }
    }

    pub fn service(&self) -> &Arc<AgentService> {
        &self.service
    }

    /// The knowledge update fires immediately; polling waits one interval
    pub async fn start(&self) {
        let (knowledge, gate) = self.service.knowledge_job();
        self.scheduler
            .spawn_periodic(
                ScheduledJob {
                    id: JobId(KNOWLEDGE_JOB),
                    interval: self.schedule.update_interval(),
                    run_immediately: true,
                },
                gate,
                move || {
                    let job = knowledge.clone();
                    async move {
                        if let Err(e) = job.run_once().await {
                            error!(job = KNOWLEDGE_JOB, category = e.category(), error = %e, "Knowledge update failed");
                        }
                    }
                },
            )
            .await;

        let (polling, gate) = self.service.polling_job();
        self.scheduler
            .spawn_periodic(
                ScheduledJob {
                    id: JobId(POLLING_JOB),
                    interval: self.schedule.polling_interval(),
                    run_immediately: false,
                },
                gate,
                move || {
                    let job = polling.clone();
                    async move {
                        if let Err(e) = job.run_once().await {
                            error!(job = POLLING_JOB, category = e.category(), error = %e, "Issue polling failed");
                        }
                    }
                },
            )
            .await;

        info!(
            update_interval_minutes = self.schedule.update_interval_minutes,
            polling_interval_minutes = self.schedule.polling_interval_minutes,
            "Agent runtime started"
        );
    }

    pub async fn shutdown(&self) {
        info!("Stopping agent runtime");
        self.scheduler.shutdown().await;
    }
}
