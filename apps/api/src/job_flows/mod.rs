// Job flows tie a resume, a cover letter and a job query to a search source.

pub mod handlers;
